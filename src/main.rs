mod config;
mod dispatch;
mod error;
mod handlers;
mod message;
mod providers;
mod router;
mod types;
mod validate;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use tower_http::cors::CorsLayer;

use config::Config;
use dispatch::Dispatcher;
use handlers::AppState;

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.allowed_origin.clone())
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/whatsapp-notify",
            post(handlers::notify).fallback(handlers::method_not_allowed),
        )
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_timed();

    let config = Arc::new(Config::from_env()?);
    info!(
        "Channels: {:?}, mode: {:?}, success policy: {:?}",
        config.channels.names(),
        config.message_mode,
        config.success_policy
    );
    if config.channels.whatsapp && config.twilio.auth_token.is_none() {
        warn!("TWILIO_AUTH_TOKEN is not set; WhatsApp requests will fail with SERVER_CONFIG_ERROR");
    }
    if config.channels.email && config.resend.api_key.is_none() {
        warn!("RESEND_API_KEY is not set; email requests will fail with SERVER_CONFIG_ERROR");
    }

    let dispatcher = Dispatcher::new(Arc::clone(&config))?;
    let addr = config.socket_addr();
    let state = Arc::new(AppState { config, dispatcher });

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
