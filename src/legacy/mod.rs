//! Read access to the legacy SQLite store.

pub mod mapping;
pub mod models;
pub mod schema;

use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::SqliteConnection;
use log::debug;
use std::path::Path;

use crate::error::ReconcileError;
use models::{LegacyBuilding, LegacyRoom, LegacyTicket};

/// Open an existing legacy store file. A missing file is an error rather
/// than an empty database, which is what SQLite would otherwise create.
pub fn open(path: &Path) -> Result<SqliteConnection, ReconcileError> {
    if !path.is_file() {
        return Err(ReconcileError::LegacyUnavailable(format!(
            "legacy store file not found: {}",
            path.display()
        )));
    }
    let url = path.to_str().ok_or_else(|| {
        ReconcileError::LegacyUnavailable(format!("legacy store path is not valid UTF-8: {}", path.display()))
    })?;
    SqliteConnection::establish(url).map_err(|e| ReconcileError::LegacyUnavailable(e.to_string()))
}

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Fail unless every table the reconciliation reads is present.
pub fn verify_schema(conn: &mut SqliteConnection) -> Result<(), ReconcileError> {
    let present: Vec<TableName> = diesel::sql_query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .load(conn)
        .map_err(|e| ReconcileError::LegacySchema(e.to_string()))?;
    let missing = schema::TABLES
        .iter()
        .filter(|t| !present.iter().any(|p| p.name == **t))
        .copied()
        .collect::<Vec<_>>();
    if missing.is_empty() {
        debug!("Legacy store has all expected tables");
        Ok(())
    } else {
        Err(ReconcileError::LegacySchema(format!("missing table(s): {}", missing.join(", "))))
    }
}

pub fn load_buildings(conn: &mut SqliteConnection) -> Result<Vec<LegacyBuilding>, ReconcileError> {
    use schema::edificios::dsl as E;
    E::edificios
        .select(LegacyBuilding::as_select())
        .order(E::id.asc())
        .load(conn)
        .map_err(ReconcileError::store("reading legacy buildings"))
}

pub fn load_rooms(conn: &mut SqliteConnection) -> Result<Vec<LegacyRoom>, ReconcileError> {
    use schema::habitaciones::dsl as H;
    H::habitaciones
        .select(LegacyRoom::as_select())
        .order(H::id.asc())
        .load(conn)
        .map_err(ReconcileError::store("reading legacy rooms"))
}

pub fn load_tickets(conn: &mut SqliteConnection) -> Result<Vec<LegacyTicket>, ReconcileError> {
    use schema::mantenimientos::dsl as M;
    M::mantenimientos
        .select(LegacyTicket::as_select())
        .order(M::id.asc())
        .load(conn)
        .map_err(ReconcileError::store("reading legacy maintenance tickets"))
}

/// In-memory legacy store loaded with the fixture schema and, optionally, rows.
#[cfg(test)]
pub(crate) fn test_store(with_rows: bool) -> SqliteConnection {
    use diesel::connection::SimpleConnection;

    let mut conn = SqliteConnection::establish(":memory:").expect("open in-memory sqlite");
    conn.batch_execute(include_str!("../../tests/data/legacy_schema.sql"))
        .expect("create legacy schema");
    if with_rows {
        conn.batch_execute(include_str!("../../tests/data/legacy_rows.sql"))
            .expect("insert legacy rows");
    }
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::connection::SimpleConnection;

    #[test]
    fn missing_file_is_reported_before_opening() {
        let result = open(Path::new("/nonexistent/legacy.sqlite"));
        assert!(matches!(result, Err(ReconcileError::LegacyUnavailable(_))));
    }

    #[test]
    fn schema_check_names_missing_tables() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.batch_execute("CREATE TABLE edificios (id INTEGER PRIMARY KEY, nombre TEXT NOT NULL);")
            .unwrap();
        match verify_schema(&mut conn) {
            Err(ReconcileError::LegacySchema(msg)) => {
                assert!(msg.contains("habitaciones"));
                assert!(msg.contains("mantenimientos"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn loads_fixture_rows_in_id_order() {
        let mut conn = test_store(true);
        verify_schema(&mut conn).unwrap();

        let buildings = load_buildings(&mut conn).unwrap();
        assert_eq!(buildings.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 3]);

        let rooms = load_rooms(&mut conn).unwrap();
        assert_eq!(rooms.len(), 3);
        assert_eq!(rooms[1].numero, None);
        assert_eq!(rooms[1].nombre.as_deref(), Some("102"));

        let tickets = load_tickets(&mut conn).unwrap();
        assert_eq!(tickets.len(), 3);
        assert_eq!(tickets[0].dia_alerta.as_deref(), Some("2024-07-25"));
        assert_eq!(tickets[1].alerta_emitida, Some(1));
    }

    #[test]
    fn fixture_rows_all_map_cleanly() {
        let mut conn = test_store(true);
        let now = chrono::Utc::now();
        for b in load_buildings(&mut conn).unwrap() {
            mapping::map_building(&b, now).unwrap();
        }
        for r in load_rooms(&mut conn).unwrap() {
            mapping::map_room(&r, now).unwrap();
        }
        let tickets = load_tickets(&mut conn)
            .unwrap()
            .iter()
            .map(|t| mapping::map_ticket(t, now).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(tickets[0].alert_day_of_month, Some(25));
        assert_eq!(tickets[1].alert_day_of_month, Some(7));
        assert_eq!(tickets[2].created_by, "system");
    }
}
