//! One-shot transfer of the legacy store into the canonical store.
//!
//! Entities move in dependency order (buildings, rooms, tickets). Every row is
//! inserted under its legacy id and skipped if that id already exists, so a
//! re-run adds nothing but also never refreshes rows changed at the source.
//! The run must not overlap with other writers: the sequence repair after
//! each entity type assumes nobody else is inserting.

use chrono::{DateTime, Utc};
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Nullable, Text};
use diesel::{PgConnection, SqliteConnection};
use log::{debug, info};
use serde::Serialize;

use crate::error::ReconcileError;
use crate::legacy::{self, mapping};
use crate::schema;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Wipe the canonical tables before migrating. Destructive.
    pub clean: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityTally {
    /// Rows read from the legacy store.
    pub legacy_rows: u64,
    /// Rows this run inserted; the rest already existed.
    pub inserted: u64,
    /// Rows in the canonical table after the run.
    pub canonical_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub cleaned: bool,
    pub buildings: EntityTally,
    pub rooms: EntityTally,
    pub maintenance_tickets: EntityTally,
    pub finished_at: DateTime<Utc>,
}

/// Open both stores and run the procedure. Nothing is written unless both
/// stores are reachable and the legacy schema has the expected tables.
pub fn run_from_paths(
    legacy_path: &std::path::Path,
    canonical_url: &str,
    options: ReconcileOptions,
) -> Result<ReconcileReport, ReconcileError> {
    let mut legacy_conn = legacy::open(legacy_path)?;
    let mut store = crate::db::Store::open(canonical_url)
        .map_err(|e| ReconcileError::CanonicalUnavailable(e.to_string()))?;
    store
        .apply_migrations()
        .map_err(|e| ReconcileError::CanonicalUnavailable(e.to_string()))?;
    let report = run(&mut legacy_conn, store.conn(), options)?;
    store.close();
    Ok(report)
}

pub fn run(
    legacy_conn: &mut SqliteConnection,
    conn: &mut PgConnection,
    options: ReconcileOptions,
) -> Result<ReconcileReport, ReconcileError> {
    legacy::verify_schema(legacy_conn)?;
    let now = Utc::now();
    info!(
        "Reconciliation starting (clean={}){}",
        options.clean,
        if options.clean { "; existing canonical rows will be deleted" } else { "" }
    );

    if options.clean {
        clean_canonical(conn)?;
    }

    let buildings = migrate_buildings(legacy_conn, conn, now)?;
    let rooms = migrate_rooms(legacy_conn, conn, now)?;
    let maintenance_tickets = migrate_tickets(legacy_conn, conn, now)?;

    let (building_count, room_count, ticket_count) = canonical_counts(conn)?;
    let report = ReconcileReport {
        cleaned: options.clean,
        buildings: EntityTally {
            canonical_rows: building_count,
            ..buildings
        },
        rooms: EntityTally {
            canonical_rows: room_count,
            ..rooms
        },
        maintenance_tickets: EntityTally {
            canonical_rows: ticket_count,
            ..maintenance_tickets
        },
        finished_at: Utc::now(),
    };
    info!(
        "Reconciliation complete: buildings={} rooms={} maintenance_tickets={} (inserted {}/{}/{})",
        report.buildings.canonical_rows,
        report.rooms.canonical_rows,
        report.maintenance_tickets.canonical_rows,
        report.buildings.inserted,
        report.rooms.inserted,
        report.maintenance_tickets.inserted
    );
    Ok(report)
}

/// Delete children before parents.
fn clean_canonical(conn: &mut PgConnection) -> Result<(), ReconcileError> {
    let tickets = diesel::delete(schema::maintenance_tickets::table)
        .execute(conn)
        .map_err(ReconcileError::store("clearing maintenance tickets"))?;
    let rooms = diesel::delete(schema::rooms::table)
        .execute(conn)
        .map_err(ReconcileError::store("clearing rooms"))?;
    let buildings = diesel::delete(schema::buildings::table)
        .execute(conn)
        .map_err(ReconcileError::store("clearing buildings"))?;
    info!(
        "Cleared canonical store: {} ticket(s), {} room(s), {} building(s)",
        tickets, rooms, buildings
    );
    Ok(())
}

fn row_error(entity: &'static str, legacy_id: i64) -> impl Fn(String) -> ReconcileError {
    move |reason| ReconcileError::Row {
        entity,
        legacy_id,
        reason,
    }
}

fn migrate_buildings(
    legacy_conn: &mut SqliteConnection,
    conn: &mut PgConnection,
    now: DateTime<Utc>,
) -> Result<EntityTally, ReconcileError> {
    use schema::buildings::dsl as B;

    let rows = legacy::load_buildings(legacy_conn)?;
    let mut tally = EntityTally {
        legacy_rows: rows.len() as u64,
        ..Default::default()
    };
    for row in &rows {
        let fail = row_error("building", row.id);
        let mapped = mapping::map_building(row, now).map_err(|e| fail(e.to_string()))?;
        let inserted = diesel::insert_into(B::buildings)
            .values(&mapped)
            .on_conflict(B::id)
            .do_nothing()
            .execute(conn)
            .map_err(|e| fail(e.to_string()))?;
        debug!("Building {}: {}", row.id, if inserted > 0 { "inserted" } else { "already present" });
        tally.inserted += inserted as u64;
    }
    if tally.inserted > 0 {
        let current_max = B::buildings
            .select(max(B::id))
            .first::<Option<i64>>(conn)
            .map_err(ReconcileError::store("reading max building id"))?;
        advance_sequence(conn, "buildings", current_max)?;
    }
    info!("Buildings: {} legacy row(s), {} inserted", tally.legacy_rows, tally.inserted);
    Ok(tally)
}

fn migrate_rooms(
    legacy_conn: &mut SqliteConnection,
    conn: &mut PgConnection,
    now: DateTime<Utc>,
) -> Result<EntityTally, ReconcileError> {
    use schema::rooms::dsl as R;

    let rows = legacy::load_rooms(legacy_conn)?;
    let mut tally = EntityTally {
        legacy_rows: rows.len() as u64,
        ..Default::default()
    };
    for row in &rows {
        let fail = row_error("room", row.id);
        let mapped = mapping::map_room(row, now).map_err(|e| fail(e.to_string()))?;
        let inserted = diesel::insert_into(R::rooms)
            .values(&mapped)
            .on_conflict(R::id)
            .do_nothing()
            .execute(conn)
            .map_err(|e| fail(e.to_string()))?;
        tally.inserted += inserted as u64;
    }
    if tally.inserted > 0 {
        let current_max = R::rooms
            .select(max(R::id))
            .first::<Option<i64>>(conn)
            .map_err(ReconcileError::store("reading max room id"))?;
        advance_sequence(conn, "rooms", current_max)?;
    }
    info!("Rooms: {} legacy row(s), {} inserted", tally.legacy_rows, tally.inserted);
    Ok(tally)
}

fn migrate_tickets(
    legacy_conn: &mut SqliteConnection,
    conn: &mut PgConnection,
    now: DateTime<Utc>,
) -> Result<EntityTally, ReconcileError> {
    use schema::maintenance_tickets::dsl as M;

    let rows = legacy::load_tickets(legacy_conn)?;
    let mut tally = EntityTally {
        legacy_rows: rows.len() as u64,
        ..Default::default()
    };
    for row in &rows {
        let fail = row_error("maintenance ticket", row.id);
        let mapped = mapping::map_ticket(row, now).map_err(|e| fail(e.to_string()))?;
        let inserted = diesel::insert_into(M::maintenance_tickets)
            .values(&mapped)
            .on_conflict(M::id)
            .do_nothing()
            .execute(conn)
            .map_err(|e| fail(e.to_string()))?;
        tally.inserted += inserted as u64;
    }
    if tally.inserted > 0 {
        let current_max = M::maintenance_tickets
            .select(max(M::id))
            .first::<Option<i64>>(conn)
            .map_err(ReconcileError::store("reading max maintenance ticket id"))?;
        advance_sequence(conn, "maintenance_tickets", current_max)?;
    }
    info!(
        "Maintenance tickets: {} legacy row(s), {} inserted",
        tally.legacy_rows, tally.inserted
    );
    Ok(tally)
}

#[derive(QueryableByName)]
struct SequenceName {
    #[diesel(sql_type = Nullable<Text>)]
    name: Option<String>,
}

#[derive(QueryableByName)]
struct SequenceState {
    #[diesel(sql_type = BigInt)]
    last_value: i64,
    #[diesel(sql_type = Bool)]
    is_called: bool,
}

/// Id the table's sequence will hand out next, with the sequence's name.
fn next_sequence_value(conn: &mut PgConnection, table: &'static str) -> Result<(String, i64), ReconcileError> {
    let seq = diesel::sql_query("SELECT pg_get_serial_sequence($1, 'id') AS name")
        .bind::<Text, _>(table)
        .get_result::<SequenceName>(conn)
        .map_err(ReconcileError::store("looking up id sequence"))?
        .name
        .ok_or_else(|| ReconcileError::CanonicalUnavailable(format!("table {table} has no id sequence")))?;
    // `seq` comes back from Postgres already quoted as an identifier.
    let state = diesel::sql_query(format!("SELECT last_value, is_called FROM {seq}"))
        .get_result::<SequenceState>(conn)
        .map_err(ReconcileError::store("reading id sequence"))?;
    let next = if state.is_called { state.last_value + 1 } else { state.last_value };
    Ok((seq, next))
}

/// Move the table's id sequence past `max(id)` so the next generated id
/// does not collide with a migrated one. The sequence never moves
/// backwards: ids handed out earlier and since deleted stay retired.
fn advance_sequence(conn: &mut PgConnection, table: &'static str, current_max: Option<i64>) -> Result<(), ReconcileError> {
    let Some(current_max) = current_max else {
        return Ok(());
    };
    let (seq, pending) = next_sequence_value(conn, table)?;
    let next = pending.max(current_max + 1);
    if next == pending {
        debug!("Sequence for {} already yields {}", table, next);
        return Ok(());
    }
    diesel::sql_query("SELECT setval($1::regclass, $2, false)")
        .bind::<Text, _>(&seq)
        .bind::<BigInt, _>(next)
        .execute(conn)
        .map_err(ReconcileError::store("advancing id sequence"))?;
    debug!("Sequence for {} now yields {}", table, next);
    Ok(())
}

/// Row counts read back from the canonical store, not from the run's own tallies.
fn canonical_counts(conn: &mut PgConnection) -> Result<(u64, u64, u64), ReconcileError> {
    let count_err = ReconcileError::store;
    let buildings: i64 = schema::buildings::table
        .count()
        .get_result(conn)
        .map_err(count_err("counting canonical buildings"))?;
    let rooms: i64 = schema::rooms::table
        .count()
        .get_result(conn)
        .map_err(count_err("counting canonical rooms"))?;
    let tickets: i64 = schema::maintenance_tickets::table
        .count()
        .get_result(conn)
        .map_err(count_err("counting canonical maintenance tickets"))?;
    Ok((buildings as u64, rooms as u64, tickets as u64))
}
