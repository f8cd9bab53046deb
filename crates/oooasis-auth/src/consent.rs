//! Interactive user consent.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use oooasis_core::AuthError;
use tokio::sync::oneshot;
use warp::Filter;

/// Ports tried for the loopback redirect listener before falling back to
/// one picked by the OS.
pub const CALLBACK_PORTS: (u16, u16) = (8080, 8089);

const SUCCESS_PAGE: &str = "<html><body><h1>Authorization successful!</h1>\
    <p>You can close this window and return to OOOasis.</p></body></html>";
const DENIED_PAGE: &str = "<html><body><h1>Authorization was not granted.</h1>\
    <p>You can close this window.</p></body></html>";

type CallbackSender = Arc<tokio::sync::Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// Obtains an authorization code from the user.
#[allow(async_fn_in_trait)]
pub trait UserConsent {
    /// Where the provider sends the user back to. Asked once per
    /// authorization, before [`UserConsent::obtain_code`].
    fn redirect_uri(&self) -> Result<String, AuthError>;

    /// Present `auth_url` and wait for the provider to hand back a code
    /// together with `state`.
    async fn obtain_code(&self, auth_url: &str, state: &str) -> Result<String, AuthError>;
}

/// Opens the consent page in a browser and receives the redirect on a
/// local HTTP listener.
///
/// Nothing is bound until a redirect URI is asked for. The socket is then
/// held until the redirect arrives, so no other process can take the port
/// in between.
pub struct LoopbackConsent {
    ports: (u16, u16),
    open_browser: bool,
    listener: Mutex<Option<TcpListener>>,
}

impl LoopbackConsent {
    pub fn new() -> Self {
        Self::with_ports(CALLBACK_PORTS.0, CALLBACK_PORTS.1)
    }

    pub fn with_ports(start: u16, end: u16) -> Self {
        Self {
            ports: (start, end),
            open_browser: true,
            listener: Mutex::new(None),
        }
    }

    /// Only print the URL. Used for headless sessions and tests.
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<TcpListener>>, AuthError> {
        self.listener
            .lock()
            .map_err(|_| AuthError::OAuthFailed("Redirect listener state poisoned".to_string()))
    }

    fn take_listener(&self) -> Result<TcpListener, AuthError> {
        match self.slot()?.take() {
            Some(listener) => Ok(listener),
            None => bind_callback_listener(self.ports),
        }
    }
}

impl Default for LoopbackConsent {
    fn default() -> Self {
        Self::new()
    }
}

impl UserConsent for LoopbackConsent {
    fn redirect_uri(&self) -> Result<String, AuthError> {
        let mut slot = self.slot()?;
        let listener = match slot.take() {
            Some(listener) => listener,
            None => bind_callback_listener(self.ports)?,
        };
        let port = local_port(&listener)?;
        *slot = Some(listener);
        Ok(format!("http://127.0.0.1:{}/", port))
    }

    async fn obtain_code(&self, auth_url: &str, state: &str) -> Result<String, AuthError> {
        let listener = self.take_listener()?;
        let port = local_port(&listener)?;
        let listen_failed =
            |e: std::io::Error| AuthError::OAuthFailed(format!("Failed to listen on port {}: {}", port, e));
        listener.set_nonblocking(true).map_err(listen_failed)?;
        let listener = tokio::net::TcpListener::from_std(listener).map_err(listen_failed)?;

        let (tx, rx) = oneshot::channel();
        let tx: CallbackSender = Arc::new(tokio::sync::Mutex::new(Some(tx)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let routes = warp::get()
            .and(warp::path::end())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(|params: HashMap<String, String>, tx: CallbackSender| async move {
                let page = if params.contains_key("error") {
                    DENIED_PAGE
                } else {
                    SUCCESS_PAGE
                };

                if let Some(sender) = tx.lock().await.take() {
                    let _ = sender.send(params);
                }

                Ok::<_, warp::Rejection>(warp::reply::html(page))
            });

        let incoming = futures::stream::unfold(listener, |listener| async move {
            let accepted = listener.accept().await.map(|(stream, _)| stream);
            Some((accepted, listener))
        });
        let server = tokio::spawn(warp::serve(routes).serve_incoming_with_graceful_shutdown(
            incoming,
            async move {
                let _ = shutdown_rx.await;
            },
        ));
        tracing::info!("Waiting for OAuth redirect on 127.0.0.1:{}", port);

        if self.open_browser {
            if let Err(e) = webbrowser::open(auth_url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }
        eprintln!("Please visit this URL to authorize OOOasis:\n\n{}\n", auth_url);

        let params = rx
            .await
            .map_err(|_| AuthError::OAuthFailed("Redirect listener stopped".to_string()));

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(Duration::from_secs(2), server).await.is_err() {
            tracing::debug!("Redirect listener did not shut down in time");
        }

        callback_code(&params?, state)
    }
}

fn callback_code(params: &HashMap<String, String>, expected_state: &str) -> Result<String, AuthError> {
    if let Some(error) = params.get("error") {
        return Err(AuthError::ConsentDenied(error.clone()));
    }

    match params.get("state") {
        Some(state) if state == expected_state => {}
        _ => return Err(AuthError::StateMismatch),
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or_else(|| AuthError::OAuthFailed("No code in callback".to_string()))
}

/// First free port in `start..=end`, or any free port when all are taken.
fn bind_callback_listener((start, end): (u16, u16)) -> Result<TcpListener, AuthError> {
    (start..=end)
        .find_map(|port| TcpListener::bind(("127.0.0.1", port)).ok())
        .map_or_else(|| TcpListener::bind(("127.0.0.1", 0)), Ok)
        .map_err(|e| AuthError::OAuthFailed(format!("Failed to bind redirect listener: {}", e)))
}

fn local_port(listener: &TcpListener) -> Result<u16, AuthError> {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| AuthError::OAuthFailed(format!("Redirect listener has no address: {}", e)))
}

/// Answers every consent request with the same outcome.
pub struct FixedConsent {
    code: Option<String>,
    calls: AtomicUsize,
    last_url: Mutex<Option<String>>,
}

impl FixedConsent {
    pub fn granting(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn denying() -> Self {
        Self {
            code: None,
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().ok().and_then(|url| url.clone())
    }
}

impl UserConsent for FixedConsent {
    fn redirect_uri(&self) -> Result<String, AuthError> {
        Ok(format!("http://127.0.0.1:{}/", CALLBACK_PORTS.0))
    }

    async fn obtain_code(&self, auth_url: &str, _state: &str) -> Result<String, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_url.lock() {
            *last = Some(auth_url.to_string());
        }

        self.code
            .clone()
            .ok_or_else(|| AuthError::ConsentDenied("access_denied".to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_callback_code() {
        let code = callback_code(&params(&[("code", "abc"), ("state", "xyz")]), "xyz").unwrap();
        assert_eq!(code, "abc");
    }

    #[test]
    fn test_callback_state_mismatch() {
        let err = callback_code(&params(&[("code", "abc"), ("state", "other")]), "xyz");
        assert!(matches!(err, Err(AuthError::StateMismatch)));

        let err = callback_code(&params(&[("code", "abc")]), "xyz");
        assert!(matches!(err, Err(AuthError::StateMismatch)));
    }

    #[test]
    fn test_callback_denied() {
        let err = callback_code(&params(&[("error", "access_denied"), ("state", "xyz")]), "xyz");
        assert!(matches!(err, Err(AuthError::ConsentDenied(e)) if e == "access_denied"));
    }

    fn port_of(redirect_uri: &str) -> u16 {
        url::Url::parse(redirect_uri).unwrap().port().unwrap()
    }

    #[test]
    fn test_redirect_uri_uses_loopback_ip_and_keeps_port() {
        let consent = LoopbackConsent::with_ports(18100, 18119);
        let uri = consent.redirect_uri().unwrap();
        assert!(uri.starts_with("http://127.0.0.1:"));
        assert!(uri.ends_with('/'));

        let port = port_of(&uri);
        assert!((18100..=18119).contains(&port));
        // The port stays reserved for this consent.
        assert!(TcpListener::bind(("127.0.0.1", port)).is_err());
        assert_eq!(consent.redirect_uri().unwrap(), uri);
    }

    #[test]
    fn test_busy_ports_fall_back_to_any_free_port() {
        let taken = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let busy = taken.local_addr().unwrap().port();

        let consent = LoopbackConsent::with_ports(busy, busy);
        let port = port_of(&consent.redirect_uri().unwrap());
        assert_ne!(port, busy);
        assert_ne!(port, 0);
    }

    #[tokio::test]
    async fn test_fixed_consent_records_calls() {
        let consent = FixedConsent::granting("code-1");
        assert_eq!(consent.obtain_code("https://auth", "s").await.unwrap(), "code-1");
        assert_eq!(consent.calls(), 1);
        assert_eq!(consent.last_url().as_deref(), Some("https://auth"));

        let denied = FixedConsent::denying();
        assert!(matches!(
            denied.obtain_code("https://auth", "s").await,
            Err(AuthError::ConsentDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_loopback_receives_redirect() {
        let consent = LoopbackConsent::with_ports(18080, 18099).without_browser();
        let port = port_of(&consent.redirect_uri().unwrap());

        let browser = tokio::spawn(async move {
            // Keep knocking until the listener is up.
            let mut stream = loop {
                match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
                    Ok(stream) => break stream,
                    Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
                }
            };
            let request = format!(
                "GET /?state=expected&code=4%2F0abc HTTP/1.1\r\nHost: 127.0.0.1:{}\r\nConnection: close\r\n\r\n",
                port
            );
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let code = consent
            .obtain_code("https://accounts.google.com/o/oauth2/auth", "expected")
            .await
            .unwrap();
        assert_eq!(code, "4/0abc");

        let response = browser.await.unwrap();
        assert!(response.contains("Authorization successful"));
    }
}
