use anyhow::{Context, Result};
use clap::Parser;
use todo_server::config::Config;
use todo_server::setup::{ensure_database_directory_from_config, initialize_app};
use todo_server::telemetry::{
    init_telemetry, log_shutdown_info, log_startup_info, report_error,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "todo-server")]
#[command(about = "Personal task manager HTTP/JSON API")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Database URL override (postgres://, postgresql:// or sqlite:)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Embedded database file override
    #[arg(long, env = "SQLITE_PATH")]
    sqlite_path: Option<String>,

    /// Listen address override
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Port override
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Static client directory override
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Seed the demo account into an empty embedded store
    #[arg(long)]
    seed_demo_data: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => Config::from_file(config_file)?,
        None => Config::from_env()?,
    };

    // Apply CLI overrides
    if let Some(ref database_url) = cli.database_url {
        config.database.url = Some(database_url.clone());
    }

    if let Some(ref sqlite_path) = cli.sqlite_path {
        config.database.sqlite_path = sqlite_path.clone();
    }

    if let Some(ref listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr.clone();
    }

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(ref static_dir) = cli.static_dir {
        config.server.static_dir = Some(static_dir.clone());
    }

    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }

    if cli.seed_demo_data {
        config.database.seed_demo_data = true;
    }

    Ok(config)
}

/// Resolve on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = load_config(&cli).context("Failed to load configuration")?;

    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    log_startup_info(&config);

    ensure_database_directory_from_config(&config)
        .context("Failed to create database directory")?;

    let (server, repository) = match initialize_app(&config).await {
        Ok(app) => app,
        Err(e) => {
            report_error(&e, "initialize_app");
            std::process::exit(2);
        }
    };

    let addr = config.server_address();
    let result = server.serve(&addr, shutdown_signal()).await;

    repository.close().await;
    log_shutdown_info();

    if let Err(e) = result {
        error!(error = %e, "HTTP server error");
        std::process::exit(3);
    }

    Ok(())
}
