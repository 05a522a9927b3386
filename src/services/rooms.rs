//! Rooms: the room half of the entity store plus the status state machine.
//!
//! Every listing is ordered by building name, then room code (then id), so
//! callers can diff successive reads.

use diesel::prelude::*;
use diesel::PgConnection;
use log::info;

use crate::db::models as dbm;
use crate::error::{FacilityError, FacilityResult};
use crate::models::facility::{NewRoom, Room, RoomChanges, RoomListing, RoomStatus};
use crate::models::normalize::{optional_text, required_text};
use crate::schema;
use crate::services::buildings::ensure_building_exists;

pub fn create_room(conn: &mut PgConnection, input: &NewRoom) -> FacilityResult<Room> {
    use schema::rooms::dsl as R;

    let code = required_text("room code", input.code.as_deref())?;
    let building_id = input
        .building_id
        .ok_or_else(|| FacilityError::validation("building id is required"))?;
    let status = match optional_text(input.status.as_deref()) {
        Some(s) => s.parse::<RoomStatus>()?,
        None => RoomStatus::default(),
    };
    let new_row = dbm::NewRoomRow {
        building_id,
        code,
        description: optional_text(input.description.as_deref()),
        status: status.as_str().to_string(),
    };

    let row = conn.transaction(|conn| {
        ensure_building_exists(conn, building_id)?;
        diesel::insert_into(R::rooms)
            .values(&new_row)
            .returning(dbm::RoomRow::as_returning())
            .get_result(conn)
            .map_err(|e| FacilityError::from_write(&format!("room {} in building {}", new_row.code, building_id), e))
    })?;
    info!("Created room {} ({}) in building {}", row.id, row.code, row.building_id);
    Room::try_from(row)
}

pub fn list_rooms(conn: &mut PgConnection) -> FacilityResult<Vec<RoomListing>> {
    load_listings(conn, None)
}

pub fn rooms_by_status(conn: &mut PgConnection, status: RoomStatus) -> FacilityResult<Vec<RoomListing>> {
    load_listings(conn, Some(status))
}

fn load_listings(conn: &mut PgConnection, status: Option<RoomStatus>) -> FacilityResult<Vec<RoomListing>> {
    use schema::buildings::dsl as B;
    use schema::rooms::dsl as R;

    let statuses = match status {
        Some(status) => vec![status.as_str()],
        None => RoomStatus::ALL.iter().map(|s| s.as_str()).collect(),
    };
    let rows: Vec<(dbm::RoomRow, String)> = R::rooms
        .inner_join(B::buildings)
        .filter(R::status.eq_any(statuses))
        .select((dbm::RoomRow::as_select(), B::name))
        .order((B::name.asc(), R::code.asc(), R::id.asc()))
        .load(conn)?;
    rows.into_iter()
        .map(|(row, building_name)| {
            Ok(RoomListing {
                room: Room::try_from(row)?,
                building_name,
            })
        })
        .collect()
}

pub fn get_room(conn: &mut PgConnection, id: i64) -> FacilityResult<Room> {
    fetch_room_row(conn, id, false).and_then(Room::try_from)
}

fn fetch_room_row(conn: &mut PgConnection, id: i64, lock: bool) -> FacilityResult<dbm::RoomRow> {
    use schema::rooms::dsl as R;

    let query = R::rooms.find(id).select(dbm::RoomRow::as_select());
    let row = if lock {
        query.for_update().first(conn).optional()?
    } else {
        query.first(conn).optional()?
    };
    row.ok_or(FacilityError::NotFound { entity: "room", id })
}

fn check_transition(room_id: i64, current: RoomStatus, next: RoomStatus) -> FacilityResult<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(FacilityError::conflict(format!(
            "room {room_id} cannot go from {current} to {next}; return it to available or maintenance first"
        )))
    }
}

/// Apply a partial update. A status change is subject to the same
/// transition rule as [`set_room_status`].
pub fn update_room(conn: &mut PgConnection, id: i64, changes: &RoomChanges) -> FacilityResult<Room> {
    use schema::rooms::dsl as R;

    let row = conn.transaction(|conn| {
        let current = Room::try_from(fetch_room_row(conn, id, true)?)?;

        let mut set = dbm::RoomChangeset::default();
        if let Some(code) = changes.code.as_deref() {
            set.code = Some(required_text("room code", Some(code))?);
        }
        if let Some(building_id) = changes.building_id {
            ensure_building_exists(conn, building_id)?;
            set.building_id = Some(building_id);
        }
        if let Some(description) = changes.description.as_ref() {
            set.description = Some(optional_text(description.as_deref()));
        }
        if let Some(status) = changes.status.as_deref() {
            let next = status.parse::<RoomStatus>()?;
            check_transition(id, current.status, next)?;
            set.status = Some(next.as_str().to_string());
        }

        if set.building_id.is_none() && set.code.is_none() && set.description.is_none() && set.status.is_none() {
            return fetch_room_row(conn, id, false);
        }
        diesel::update(R::rooms.find(id))
            .set(&set)
            .returning(dbm::RoomRow::as_returning())
            .get_result(conn)
            .map_err(|e| FacilityError::from_write(&format!("room {id}"), e))
    })?;
    Room::try_from(row)
}

/// Delete a room; its maintenance tickets go with it.
pub fn delete_room(conn: &mut PgConnection, id: i64) -> FacilityResult<()> {
    use schema::rooms::dsl as R;

    let deleted = diesel::delete(R::rooms.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(FacilityError::NotFound { entity: "room", id });
    }
    info!("Deleted room {}", id);
    Ok(())
}

/// Move a room to `new_status`. Setting the current status again is a no-op.
pub fn set_room_status(conn: &mut PgConnection, room_id: i64, new_status: &str) -> FacilityResult<Room> {
    use schema::rooms::dsl as R;

    let next = new_status.parse::<RoomStatus>()?;
    let row = conn.transaction(|conn| {
        let current = fetch_room_row(conn, room_id, true)?;
        let current_status = current.status.parse::<RoomStatus>()?;
        if current_status == next {
            return Ok(current);
        }
        check_transition(room_id, current_status, next)?;
        let updated = diesel::update(R::rooms.find(room_id))
            .set(R::status.eq(next.as_str()))
            .returning(dbm::RoomRow::as_returning())
            .get_result(conn)?;
        info!("Room {} status {} -> {}", room_id, current_status, next);
        Ok::<_, FacilityError>(updated)
    })?;
    Room::try_from(row)
}
