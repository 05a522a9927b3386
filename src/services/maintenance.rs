use diesel::prelude::*;
use diesel::PgConnection;
use log::info;

use crate::db::models as dbm;
use crate::error::{FacilityError, FacilityResult};
use crate::models::facility::{MaintenanceTicket, NewTicket, TicketChanges, TicketKind, TicketStatus};
use crate::models::normalize::{self, day_to_column, optional_text, required_text};
use crate::schema;

fn room_exists(conn: &mut PgConnection, room_id: i64) -> FacilityResult<bool> {
    use schema::rooms::dsl as R;
    Ok(diesel::select(diesel::dsl::exists(R::rooms.find(room_id))).get_result(conn)?)
}

pub fn create_ticket(conn: &mut PgConnection, input: &NewTicket) -> FacilityResult<MaintenanceTicket> {
    use schema::maintenance_tickets::dsl as M;

    let new_row = normalize::new_ticket_row(input)?;
    let row = conn.transaction(|conn| {
        if !room_exists(conn, new_row.room_id)? {
            return Err(FacilityError::validation(format!("room {} does not exist", new_row.room_id)));
        }
        diesel::insert_into(M::maintenance_tickets)
            .values(&new_row)
            .returning(dbm::TicketRow::as_returning())
            .get_result(conn)
            .map_err(|e| FacilityError::from_write("maintenance ticket", e))
    })?;
    info!(
        "Created maintenance ticket {} for room {} (kind={}, alert_day={})",
        row.id,
        row.room_id,
        row.kind,
        row.alert_day_of_month.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );
    MaintenanceTicket::try_from(row)
}

/// Tickets, newest first, optionally restricted to one room.
pub fn list_tickets(conn: &mut PgConnection, room_id: Option<i64>) -> FacilityResult<Vec<MaintenanceTicket>> {
    use schema::maintenance_tickets::dsl as M;

    let rows: Vec<dbm::TicketRow> = match room_id {
        Some(room_id) => {
            if !room_exists(conn, room_id)? {
                return Err(FacilityError::NotFound { entity: "room", id: room_id });
            }
            M::maintenance_tickets
                .filter(M::room_id.eq(room_id))
                .select(dbm::TicketRow::as_select())
                .order((M::created_at.desc(), M::id.desc()))
                .load(conn)?
        }
        None => M::maintenance_tickets
            .select(dbm::TicketRow::as_select())
            .order((M::created_at.desc(), M::id.desc()))
            .load(conn)?,
    };
    rows.into_iter().map(MaintenanceTicket::try_from).collect()
}

pub fn get_ticket(conn: &mut PgConnection, id: i64) -> FacilityResult<MaintenanceTicket> {
    fetch_ticket_row(conn, id, false).and_then(MaintenanceTicket::try_from)
}

fn fetch_ticket_row(conn: &mut PgConnection, id: i64, lock: bool) -> FacilityResult<dbm::TicketRow> {
    use schema::maintenance_tickets::dsl as M;

    let query = M::maintenance_tickets.find(id).select(dbm::TicketRow::as_select());
    let row = if lock {
        query.for_update().first(conn).optional()?
    } else {
        query.first(conn).optional()?
    };
    row.ok_or(FacilityError::NotFound {
        entity: "maintenance ticket",
        id,
    })
}

/// Apply field edits. Rescheduling the alert (time or day) re-arms it; any
/// other edit leaves the fired flag alone.
pub fn update_ticket(conn: &mut PgConnection, id: i64, changes: &TicketChanges) -> FacilityResult<MaintenanceTicket> {
    use schema::maintenance_tickets::dsl as M;

    let row = conn.transaction(|conn| {
        let current = MaintenanceTicket::try_from(fetch_ticket_row(conn, id, true)?)?;

        let mut set = dbm::TicketChangeset::default();
        if let Some(description) = changes.description.as_deref() {
            set.description = Some(required_text("description", Some(description))?);
        }
        if let Some(kind) = changes.kind.as_deref() {
            set.kind = Some(kind.parse::<TicketKind>()?.as_str().to_string());
        }
        if let Some(status) = changes.status.as_deref() {
            set.status = Some(status.parse::<TicketStatus>()?.as_str().to_string());
        }
        if let Some(scheduled_date) = changes.scheduled_date {
            set.scheduled_date = Some(scheduled_date);
        }
        if changes.touches_alert() {
            let time = changes.alert_time.unwrap_or(current.alert_time);
            let day = changes
                .alert_day_of_month
                .unwrap_or(current.alert_day_of_month.map(day_to_column));
            let scheduled_date = changes.scheduled_date.unwrap_or(current.scheduled_date);
            let alert = normalize::alert_schedule(time, day, scheduled_date)?;
            set.alert_time = Some(alert.time);
            set.alert_day_of_month = Some(alert.day_of_month.map(day_to_column));
            set.alert_fired = Some(false);
            set.alert_fired_at = Some(None);
        }
        if let Some(notes) = changes.notes.as_ref() {
            set.notes = Some(optional_text(notes.as_deref()));
        }

        if set.is_empty() {
            return fetch_ticket_row(conn, id, false);
        }
        diesel::update(M::maintenance_tickets.find(id))
            .set(&set)
            .returning(dbm::TicketRow::as_returning())
            .get_result(conn)
            .map_err(|e| FacilityError::from_write(&format!("maintenance ticket {id}"), e))
    })?;
    MaintenanceTicket::try_from(row)
}

pub fn delete_ticket(conn: &mut PgConnection, id: i64) -> FacilityResult<()> {
    use schema::maintenance_tickets::dsl as M;

    let deleted = diesel::delete(M::maintenance_tickets.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(FacilityError::NotFound {
            entity: "maintenance ticket",
            id,
        });
    }
    info!("Deleted maintenance ticket {}", id);
    Ok(())
}
