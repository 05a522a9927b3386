//! Canonical store handle.

pub mod models;

use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use crate::error::{FacilityError, FacilityResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Owns the connection to the canonical store for the lifetime of one
/// caller. Operations borrow it through [`Store::conn`]; dropping the handle
/// closes the connection on every exit path.
pub struct Store {
    conn: PgConnection,
}

impl Store {
    pub fn open(database_url: &str) -> FacilityResult<Self> {
        let conn = PgConnection::establish(database_url)?;
        Ok(Store { conn })
    }

    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub fn apply_migrations(&mut self) -> FacilityResult<()> {
        apply_migrations(&mut self.conn)
    }

    pub fn close(self) {
        drop(self.conn);
        info!("Canonical store connection closed");
    }
}

pub fn apply_migrations(conn: &mut PgConnection) -> FacilityResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| FacilityError::Migration(e.to_string()))?;
    if applied.is_empty() {
        info!("Database schema is up to date; no migrations were applied");
    } else {
        let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        info!("Applied {} database migration(s): {}", applied.len(), names);
    }
    Ok(())
}

/// Connection for store-backed tests, or `None` when `TEST_DATABASE_URL` is
/// not set. The schema is migrated once per process; each test then runs
/// inside a transaction that is rolled back on drop. Tests are serialized
/// because the reconciliation tests reset id sequences, which is not
/// transactional.
#[cfg(test)]
pub(crate) fn test_connection() -> Option<TestConnection> {
    let mut test = open_test_connection()?;
    test.conn.begin_test_transaction().expect("begin test transaction");
    Some(test)
}

/// Like [`test_connection`] but without the enclosing transaction, for tests
/// that need other connections to see their rows. Such tests clean up after
/// themselves.
#[cfg(test)]
pub(crate) fn committing_test_connection() -> Option<TestConnection> {
    open_test_connection()
}

#[cfg(test)]
fn open_test_connection() -> Option<TestConnection> {
    use std::sync::Mutex;

    static LOCK: Mutex<bool> = Mutex::new(false);

    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let mut migrated = LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let mut conn = PgConnection::establish(&url).expect("connect to TEST_DATABASE_URL");
    if !*migrated {
        apply_migrations(&mut conn).expect("migrate test database");
        *migrated = true;
    }
    Some(TestConnection {
        conn,
        url,
        _lock: migrated,
    })
}

#[cfg(test)]
pub(crate) struct TestConnection {
    conn: PgConnection,
    url: String,
    _lock: std::sync::MutexGuard<'static, bool>,
}

#[cfg(test)]
impl TestConnection {
    pub(crate) fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
impl std::ops::Deref for TestConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.conn
    }
}

#[cfg(test)]
impl std::ops::DerefMut for TestConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}
