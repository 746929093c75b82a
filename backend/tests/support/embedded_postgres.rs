//! Embedded PostgreSQL for the Diesel adapter tests.
//!
//! One cluster is shared by every test in a binary; each test gets its own
//! temporary database with the storefront migrations applied. Cluster
//! bootstrap blocks, so call these helpers outside any Tokio runtime.

use pg_embedded_setup_unpriv::TemporaryDatabase;
use storefront::outbound::persistence::run_pending_migrations;
use tokio::runtime::Runtime;

/// Returns true when `SKIP_TEST_CLUSTER` is "1", "true" or "yes".
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip with a marker when `SKIP_TEST_CLUSTER` is set, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// A fresh database on the shared cluster, migrated to the latest schema.
pub fn migrated_database(runtime: &Runtime) -> Result<TemporaryDatabase, String> {
    assert!(
        tokio::runtime::Handle::try_current().is_err(),
        "bootstrap the embedded cluster outside a Tokio runtime"
    );

    let cluster = pg_embedded_setup_unpriv::test_support::shared_cluster_handle()
        .map_err(|err| format!("shared cluster: {err:?}"))?;
    let database = cluster
        .create_temporary_database()
        .map_err(|err| format!("temporary database: {err:?}"))?;

    let url = database.url().to_string();
    runtime
        .block_on(run_pending_migrations(&url))
        .map_err(|err| err.to_string())?;
    Ok(database)
}
