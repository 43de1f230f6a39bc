use filedeck_lib::{
    api, config::AppConfig, connector::ProtocolConnector, logging, service::RemoteFileService,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("filedeck: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    logging::init(&config.logging);

    let addr = config.listen_addr();
    let service = RemoteFileService::new(Arc::new(ProtocolConnector), config);
    let app = api::create_router(service.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("filedeck listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("could not listen for Ctrl-C; running until killed");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await?;

    let open = service.session_count().await;
    if open > 0 {
        tracing::info!(sessions = open, "closing remaining sessions");
    }
    service.disconnect_all().await;
    Ok(())
}
