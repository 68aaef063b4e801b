use hbnb::{
    config,
    console::{Console, Flow},
    errors::{Error, Result},
    storage::{Engine, Storage},
};
use dotenvy::dotenv;
use std::io::{self, BufRead, IsTerminal};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing on stderr so the interpreter owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();

    // 3. Load the configuration and build the selected backend
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(backend = ?app_config.storage.backend, "Configuration loaded");

    let mut engine = Engine::from_config(&app_config);
    engine
        .reload()
        .await
        .inspect_err(|e| error!("Failed to load storage: {}", e))?;

    // 4. Run the interpreter until quit or end of input
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut console = Console::new(engine, io::stdout());
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            console.prompt()?;
        }
        let line = match lines.next() {
            Some(line) => line.map_err(|source| Error::Io {
                path: "<stdin>".into(),
                source,
            })?,
            None => {
                debug!("End of input");
                console.onecmd("EOF").await?;
                break;
            }
        };
        if console.onecmd(&line).await? == Flow::Stop {
            break;
        }
    }

    let (mut engine, _) = console.into_parts();
    engine.close().await;
    Ok(())
}
