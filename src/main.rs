use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use photoshare::{
    Config, build_state, create_app,
    db::{DynRepository, SqliteRepository},
    photos::{Event, EventId},
    startup_checks, storage,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage events
    #[command(subcommand)]
    Event(EventCommands),
}

#[derive(Subcommand, Debug)]
enum EventCommands {
    /// List all events
    List,
    /// Create a new event
    Create {
        /// Display name of the event
        name: String,
        /// Contact of the event's administrator
        admin: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Event(event_cmd)) => handle_event_command(&config, event_cmd).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, None, None, None).await
        }
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        let config = toml_edit::de::from_str::<Config>(&config_content)?;
        info!("Configuration loaded from: {:?}", config_path);
        Ok(config)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

async fn handle_event_command(
    config: &Config,
    cmd: EventCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository: DynRepository = Arc::new(SqliteRepository::open(&config.database.path)?);

    match cmd {
        EventCommands::List => {
            let events = repository.list_events().await?;
            if events.is_empty() {
                println!("No events in database");
            } else {
                println!("Events in database:");
                for event in events {
                    let photos = repository.count_photos(event.event_id).await?;
                    println!(
                        "  {} {} <{}> ({} photos)",
                        event.event_id, event.name, event.admin, photos
                    );
                }
            }
        }
        EventCommands::Create { name, admin } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                eprintln!("Error: Event name must not be empty");
                std::process::exit(1);
            }

            let event = Event {
                event_id: EventId::generate(),
                name,
                admin: admin.trim().to_string(),
            };
            repository.insert_event(&event).await?;
            println!("Created event '{}' with id {}", event.name, event.event_id);
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Database: {:?}", config.database.path);
    for spec in &config.thumbnails.sizes {
        info!("Thumbnail size: {}", spec);
    }

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let repository: DynRepository = Arc::new(SqliteRepository::open(&config.database.path)?);
    let store = storage::create_store(&config.storage).await?;
    info!("Object store: {}", store.name());

    let (app_state, worker) = build_state(config, repository, store);
    let queue = app_state.queue.clone();
    let worker_handle = worker.spawn();

    let app = create_app(app_state);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown
    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    // Start the server
    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    // Let the worker finish what was already accepted
    info!(
        "Shutting down - waiting for {} thumbnail job(s)...",
        queue.pending()
    );
    queue.shutdown();
    if let Err(e) = worker_handle.await {
        tracing::error!("Thumbnail worker ended abnormally: {}", e);
    } else {
        info!("Thumbnail worker drained");
    }

    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
