//! pgdb - main entry point.
//!
//! Opens a pool against the configured database, routes driver traces into the
//! pool's structured logger, and round-trips a UUID and a NUMERIC value to check
//! that the extension codecs are in place.

use pgdb::PgDb;
use pgdb::config::Config;
use pgdb::db::register_types;
use pgdb::trace::{PgLogger, TraceLayer, Tracer};
use rust_decimal::Decimal;
use sqlx::Row;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

/// Initialize the tracing subscriber: application logs plus the driver trace sink.
fn init_tracing(
    config: &Config,
    tracer: &Arc<dyn Tracer>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Driver events belong to the trace sink only.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level))
        .add_directive("sqlx=off".parse::<Directive>()?);

    let subscriber =
        tracing_subscriber::registry().with(TraceLayer::driver_only(Arc::clone(tracer)));

    if config.json_logs {
        subscriber.with(fmt::layer().json().with_filter(filter)).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_filter(filter))
            .init();
    }
    Ok(())
}

async fn check_codecs(db: &PgDb) -> Result<(), Box<dyn std::error::Error>> {
    let id = Uuid::new_v4();
    let amount = Decimal::new(1_234_567, 3);

    let row = sqlx::query("SELECT $1::uuid AS id, $2::numeric AS amount")
        .bind(id)
        .bind(amount)
        .fetch_one(db.pool())
        .await?;

    let returned_id: Uuid = row.try_get("id")?;
    let returned_amount: Decimal = row.try_get("amount")?;

    if returned_id != id || returned_amount != amount {
        return Err(format!(
            "value mismatch: sent ({id}, {amount}), received ({returned_id}, {returned_amount})"
        )
        .into());
    }

    info!(id = %returned_id, amount = %returned_amount, "Round-tripped extension types");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    let database = config.database()?;
    let masked = database.masked();

    // The sink is installed before the pool so eager construction is traced too.
    let tracer: Arc<dyn Tracer> = Arc::new(PgLogger::new(&config.pg_log_level));
    init_tracing(&config, &tracer)?;

    let db = PgDb::with_database(database, tracer, register_types).await?;

    info!(
        database = %masked,
        max_connections = db.options().max_connections_or_default(),
        eager = db.options().connects_eagerly(),
        prepared = db.connection_types().prepared(),
        "Pool ready, version {}",
        env!("CARGO_PKG_VERSION")
    );

    let result = check_codecs(&db).await;
    db.close().await;

    if let Err(e) = result {
        error!(error = %e, "Codec check failed");
        return Err(e);
    }

    info!("Codec check passed");
    Ok(())
}
