//! Green Box factory assistant server

use greenbox_server::api;
use greenbox_server::config::AppConfig;
use greenbox_server::core::services::{GenAiActionService, MyChatService};
use greenbox_server::core::session::SessionRegistry;
use greenbox_server::infrastructure::database::DatabaseConnection;
use greenbox_server::infrastructure::gemini::GeminiClient;
use greenbox_server::infrastructure::repositories::DbEquipmentRepository;

use anyhow::anyhow;
use axum::http::{HeaderValue, Method};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task())
}

async fn web_server_task() -> anyhow::Result<()> {
    let config = AppConfig::create();

    let pool = DatabaseConnection::open(&config.database_url).await?;
    DatabaseConnection::install(pool);

    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbEquipmentRepository::scoped())
        .add(GeminiClient::singleton())
        .add(SessionRegistry::singleton())
        .add(GenAiActionService::scoped())
        .add(MyChatService::scoped())
        .build_provider()
        .map_err(|e| anyhow!("invalid service configuration: {e}"))?;

    let app = api::router()
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_origin([
                    HeaderValue::from_static("http://localhost:3000"),
                    HeaderValue::from_static("http://localhost:9002"),
                ]),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}
