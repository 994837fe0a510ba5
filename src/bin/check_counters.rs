//! Compares every article's `favorites_count` with its favorite rows and
//! exits non-zero when any have drifted. Counters are reported, not fixed.

use std::process::ExitCode;

use conduit_relations::{
    Config,
    database::create_pool,
    relation::{FAVORITED_USERS, PgStorage, Relations},
    telemetry::init_telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env();

    let telemetry_guard = init_telemetry(&config)?;

    let pool = create_pool(&config).await?;
    let relations = Relations::new(PgStorage::new(pool));

    let drifted = relations.checker.scan(&FAVORITED_USERS).await?;

    for report in &drifted {
        tracing::warn!(
            article_id = report.owner,
            stored = report.stored,
            actual = report.actual,
            "favorites_count does not match favorite rows"
        );
    }

    tracing::info!(drifted = drifted.len(), "Counter check complete");
    telemetry_guard.shutdown();

    Ok(if drifted.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
