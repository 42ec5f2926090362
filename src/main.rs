use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use printer_telemetry::config::AppConfig;
use printer_telemetry::formatter::JsonFormatter;
use printer_telemetry::handlers::AppState;
use printer_telemetry::routes::create_router;
use printer_telemetry::service::{build_poller, PrinterService};
use printer_telemetry::store::MemoryStore;

#[derive(Parser, Debug)]
#[command(name = "printer-telemetry", about = "Опрос принтеров по SNMP")]
struct Cli {
    /// Путь к YAML конфигурации (иначе PRINTER_CONFIG или ./printers.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// HTTP сервер
    Serve,
    /// Разовый опрос с выводом JSON
    Poll {
        /// Только этот принтер
        #[arg(long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let path = AppConfig::resolve_path(cli.config.as_deref());
    let config = AppConfig::load(&path)?;
    config.debug_config();

    let store = Arc::new(MemoryStore::from_devices(config.inventory.printers.clone()));
    let service = Arc::new(PrinterService::new(
        store.clone(),
        store.clone(),
        Arc::new(build_poller(&config)),
        config.get_concurrency(),
    ));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, service, store).await,
        Command::Poll { device } => poll(service, device).await,
    }
}

async fn serve(config: &AppConfig, service: Arc<PrinterService>, store: Arc<MemoryStore>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let state = AppState {
        service,
        store,
        shutdown: shutdown.clone(),
    };

    let bind = config.get_bind();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .context(format!("Не удалось занять адрес {}", bind))?;
    info!(%bind, "сервер запущен");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("остановка");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

async fn poll(service: Arc<PrinterService>, device: Option<String>) -> Result<()> {
    let json = match device {
        Some(id) => match service.inspect_one(&id).await {
            Ok(report) => match JsonFormatter::format_report(&report) {
                Some(json) => JsonFormatter::to_json_string(&json)?,
                None => {
                    let error = report.outcome.err().map(|e| e.to_string()).unwrap_or_default();
                    error!(device = %id, error = %error, "опрос не удался");
                    failure_json(&id, &error)?
                }
            },
            Err(e) => {
                error!(device = %id, error = %e, "опрос не удался");
                failure_json(&id, &e.to_string())?
            }
        },
        None => {
            let cancel = CancellationToken::new();
            let guard = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    guard.cancel();
                }
            });
            let report = service.refresh_all_with(cancel).await;
            JsonFormatter::to_json_string(&JsonFormatter::format_batch(&report))?
        }
    };

    println!("{}", json);
    Ok(())
}

fn failure_json(device_id: &str, error: &str) -> Result<String> {
    JsonFormatter::to_json_string(&serde_json::json!({
        "device_id": device_id,
        "success": false,
        "error": error,
    }))
}
