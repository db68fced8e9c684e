use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use shop_katha::infrastructure::config::AppConfig;
use shop_katha::infrastructure::logging::init_logging;
use shop_katha::presentation::handlers::AppState;
use shop_katha::presentation::middleware::{JwtAuthMiddleware, RequestLogMiddleware};
use shop_katha::presentation::routes;
use tracing::{info, instrument};

#[tokio::main]
#[instrument]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    init_logging(&config.log_filter);
    info!(filter = %config.log_filter, "Logging initialized successfully");

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    info!(upload_dir = %config.upload_dir.display(), "Upload directory ready");

    info!("Initializing application state");
    let state = web::Data::new(AppState::in_memory(&config));
    info!(write_retries = config.write_retries, "Application state initialized");

    let jwt_secret = config.jwt_secret.clone();
    let allowed_origin = config.cors_allowed_origin.clone();

    info!("Configuring HTTP server");
    let server = HttpServer::new(move || {
        tracing::trace!("Creating new application instance");
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(state.clone())
            .wrap(JwtAuthMiddleware::new(jwt_secret.clone()))
            .wrap(cors)
            .wrap(RequestLogMiddleware)
            .configure(routes::configure)
    });

    let (host, port) = config.bind_address();
    info!(host = %host, port, "Binding server to address");
    let server = server.bind((host.as_str(), port))?;

    info!(
        host = %host,
        port,
        origin = %config.cors_allowed_origin,
        "Starting HTTP server"
    );
    server.run().await?;
    Ok(())
}
