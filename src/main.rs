use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use sales_voucher::config::{run_migrations, Config};
use sales_voucher::middleware::{json_error_handler, path_error_handler, RequestId};
use sales_voucher::modules::pricing::MySqlPricingSource;
use sales_voucher::modules::vouchers::MySqlVoucherStore;
use sales_voucher::{configure_routes, AppState};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sales_voucher=debug,actix_web=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = Config::from_env().map_err(std::io::Error::other)?;
    init_tracing(config.app.json_logs());
    config.validate().map_err(std::io::Error::other)?;

    tracing::info!("Starting sales voucher service");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .map_err(std::io::Error::other)?;

    run_migrations(&db_pool)
        .await
        .map_err(std::io::Error::other)?;

    let state = AppState::new(
        Arc::new(MySqlPricingSource::new(db_pool.clone())),
        Arc::new(MySqlVoucherStore::new(db_pool.clone())),
        config.pricing.clone(),
    );

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestId)
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes)
    })
    .workers(config.server.workers)
    .shutdown_timeout(config.server.shutdown_timeout_secs)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}
