use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use ingest_backend::analytics::{start_event_writer, SqliteEventTracker};
use ingest_backend::config::Config;
use ingest_backend::db::Database;
use ingest_backend::integrity::IntegrityTokens;
use ingest_backend::middleware::Correlation;
use ingest_backend::services;
use ingest_backend::state::AppState;
use log::{error, info};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::parse();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
    }

    let db = Database::new(&config.database);
    db.init().map_err(|e| {
        error!("Failed to initialise database {}: {}", db.path().display(), e);
        io::Error::other(e.to_string())
    })?;

    // Start analytics writer task
    let (tracker, rx) = SqliteEventTracker::channel();
    tokio::spawn(start_event_writer(db.clone(), rx));

    let limits = config.limits();
    let state = AppState::new(
        db,
        limits,
        IntegrityTokens::new(config.secret(), limits.token_ttl_ms),
        Arc::new(tracker),
    );

    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Correlation)
            .wrap(Logger::new("%a \"%r\" %s %b %Dms corr=%{x-correlation-id}o"))
            .app_data(web::Data::new(state.clone()))
            .service(services::data_sources::csv::configure_routes())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
