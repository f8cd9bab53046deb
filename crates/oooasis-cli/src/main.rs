use clap::{CommandFactory, Parser};
use oooasis_cli::{app, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if std::env::args_os().len() <= 1 {
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    }

    let cli = Cli::parse();
    oooasis_core::init_logging(cli.verbose);

    if let Err(e) = app::run(&cli).await {
        tracing::debug!("{:?}", e);
        eprintln!("Error: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(e.exit_code());
    }
}
