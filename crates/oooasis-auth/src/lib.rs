pub mod authenticator;
pub mod consent;
pub mod google;
pub mod secrets;
pub mod storage;

pub use authenticator::Authenticator;
pub use consent::{FixedConsent, LoopbackConsent, UserConsent};
pub use google::{GoogleOAuth, CALENDAR_SCOPE};
pub use secrets::{ClientSecrets, DEFAULT_CLIENT_SECRETS};
pub use storage::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenSet, DEFAULT_TOKEN_CACHE,
};
