use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use image_service::rpc::RpcServer;
use image_service::web::WebServer;
use image_service::{
    AdmissionController, Config, ContentValidator, FileStore, OperationClass, Result,
    ServiceError, TransferService,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = image_service::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        image_service::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

fn parse_addr(addr: String, what: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|e| ServiceError::Config(format!("invalid {what} address {addr}: {e}")))
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let http_addr = parse_addr(config.http_addr(), "HTTP")?;
    let grpc_addr = parse_addr(config.grpc_addr(), "gRPC")?;

    let store = FileStore::new(&config.storage.upload_dir)?;
    info!("Upload directory: {}", store.root().display());

    let validator = ContentValidator::new(config.storage.allowed_types.iter().cloned());
    let service = Arc::new(
        TransferService::new(store, validator).with_max_file_size(config.server.max_file_size),
    );
    let admission = Arc::new(AdmissionController::new(
        config.limits.transfer_permits,
        config.limits.list_permits,
    ));

    info!(
        transfer_permits = admission.limit(OperationClass::Transfer),
        list_permits = admission.limit(OperationClass::List),
        max_file_size = config.server.max_file_size,
        "Image service starting"
    );

    let web = WebServer::new(http_addr, service.clone(), admission.clone());
    let rpc = RpcServer::new(grpc_addr, service, admission);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Either server stopping takes the other one down with it.
    let http = async {
        let result = web.run_until(wait_for_shutdown(shutdown_rx.clone())).await;
        shutdown_tx.send_replace(true);
        result.map_err(ServiceError::from)
    };
    let grpc = async {
        let result = rpc.run_until(wait_for_shutdown(shutdown_rx.clone())).await;
        shutdown_tx.send_replace(true);
        result
    };
    let signal = async {
        let mut rx = shutdown_rx.clone();
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Shutdown signal received");
                    shutdown_tx.send_replace(true);
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            },
            _ = rx.changed() => {}
        }
    };

    let (http_result, grpc_result, ()) = tokio::join!(http, grpc, signal);
    http_result?;
    grpc_result?;

    info!("Image service stopped");
    Ok(())
}
