use std::{fs::OpenOptions, process::ExitCode};

use actix_web::{web, App, HttpServer};
use migration::{Migrator, MigratorTrait as _};
use sea_orm::Database;
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use solar_hr::{auth::Authority, config, hash::IntegrityHasher, pages};

#[actix_web::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let log_path = config::log_file();
    let log_file = match OpenOptions::new().append(true).create(true).open(&log_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("unable to open log file `{log_path}`: {err}");
            return ExitCode::FAILURE
        },
    };

    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("unable to install tracing subscriber: {err}");
        return ExitCode::FAILURE
    }

    let config::Config {
        host_address,
        database_opt,
        jwt_key,
        hash_algorithm,
    } = config::load();

    let connection = match Database::connect(database_opt).await {
        Ok(connection) => connection,
        Err(err) => {
            error!(error = %err, "unable to connect to database");
            return ExitCode::FAILURE
        },
    };

    if let Err(err) = Migrator::up(&connection, None).await {
        error!(error = %err, "unable to apply migrations");
        return ExitCode::FAILURE
    }

    info!(%hash_algorithm, "integrity hashing configured");

    let database = web::Data::new(connection);
    let authority = web::Data::new(Authority::new(jwt_key.as_bytes()));
    let hasher = web::Data::new(IntegrityHasher::new(hash_algorithm));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(database.clone())
            .app_data(authority.clone())
            .app_data(hasher.clone())
            .wrap(TracingLogger::default())
            .configure(pages::config)
    });

    let server = match server.bind(host_address) {
        Ok(server) => server,
        Err(err) => {
            error!(error = %err, %host_address, "unable to bind");
            return ExitCode::FAILURE
        },
    };

    info!(%host_address, "listening");

    if let Err(err) = server.run().await {
        error!(error = %err, "server stopped");
        return ExitCode::FAILURE
    }

    ExitCode::SUCCESS
}
