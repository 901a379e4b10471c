//! cattach binary entry point.
//!
//! Interactive console attach for remote containers.

use clap::Parser;
use tracing::{error, info};

use cattach_client::{
    Cli, EventLoop, HttpResizeClient, ResizeRequester, SessionConfig, SessionOutcome, TtyGuard,
    WinchBridge, spawn_stdin_reader, tty_size,
};
use cattach_core::attach::WsAttachSession;
use cattach_core::endpoint::ContainerEndpoint;
use cattach_core::error::Result;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cattach_core::init_logging(cli.verbose, cli.log_file.as_deref(), cli.log_format.into()) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "cattach starting");

    let config = match cli.session_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid arguments");
            eprintln!("cattach: {}", e);
            std::process::exit(2);
        }
    };
    let endpoint = cli.endpoint();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(run_session(endpoint, config));

    match result {
        Ok(outcome) => {
            info!(?outcome, "session ended");
        }
        Err(e) => {
            error!(error = %e, "session failed");
            eprintln!("cattach: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_session(endpoint: ContainerEndpoint, config: SessionConfig) -> Result<SessionOutcome> {
    info!(host = %endpoint.host, container = %endpoint.container_id, "connecting");

    let session = WsAttachSession::connect(&endpoint).await?;
    info!("attached; type \"{}.\" to disconnect", config.escape as char);

    let resize = HttpResizeClient::new(endpoint);

    // Size the remote pty to the local terminal before any output arrives.
    if let Some((rows, cols)) = tty_size()
        && let Err(e) = resize.resize(rows, cols).await
    {
        tracing::debug!(error = %e, "initial resize failed");
    }

    // Raw mode and the resize subscription span the whole loop lifetime;
    // both are released on every exit path when this scope unwinds.
    let _guard = TtyGuard::acquire()?;
    let _bridge = WinchBridge::start(resize)?;

    let input = spawn_stdin_reader(config.read_buffer);
    EventLoop::new(session, input, tokio::io::stdout(), &config)
        .run()
        .await
}
