//! Deterministic demo hotel for local development and UI work.

use chrono::{Datelike, Duration, Local, NaiveTime};
use diesel::prelude::*;
use diesel::PgConnection;
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::FacilityResult;
use crate::models::facility::{NewBuilding, NewRoom, NewTicket, RoomStatus, TicketKind};
use crate::schema;
use crate::services::{buildings, maintenance, rooms};

const SEED: u64 = 0x0407_E1DE_5EED_0001;
const BUILDINGS: [(&str, &str); 3] = [
    ("Main Building", "Reception, restaurant and standard rooms"),
    ("Garden Wing", "Ground-floor rooms facing the garden"),
    ("Sea Tower", "Suites with sea view"),
];
const FLOORS: u32 = 3;
const ROOMS_PER_FLOOR: u32 = 6;
const TASKS: [&str; 8] = [
    "Replace AC filter",
    "Fix leaking tap",
    "Check smoke detector",
    "Repaint door frame",
    "Replace shower head",
    "Inspect minibar fridge",
    "Re-grout bathroom tiles",
    "Service window locks",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub buildings: usize,
    pub rooms: usize,
    pub tickets: usize,
}

/// Populate an empty canonical store. Does nothing if any building exists.
pub fn seed(conn: &mut PgConnection) -> FacilityResult<SeedSummary> {
    let existing: i64 = schema::buildings::table.count().get_result(conn)?;
    if existing > 0 {
        info!("Demo data: store already has {} building(s); skipping", existing);
        return Ok(SeedSummary::default());
    }

    let mut rng = SmallRng::seed_from_u64(SEED);
    let today = Local::now().date_naive();
    let mut summary = SeedSummary::default();

    conn.transaction(|conn| {
        for (name, description) in BUILDINGS {
            let building = buildings::create_building(
                conn,
                &NewBuilding {
                    name: Some(name.to_string()),
                    description: Some(description.to_string()),
                },
            )?;
            summary.buildings += 1;

            for floor in 1..=FLOORS {
                for n in 1..=ROOMS_PER_FLOOR {
                    let code = format!("{}{:02}", floor, n);
                    let status = pick_status(&mut rng);
                    let room = rooms::create_room(
                        conn,
                        &NewRoom {
                            code: Some(code),
                            building_id: Some(building.id),
                            description: None,
                            status: Some(status.as_str().to_string()),
                        },
                    )?;
                    summary.rooms += 1;

                    if status == RoomStatus::Maintenance || rng.random_bool(0.2) {
                        let scheduled = today + Duration::days(rng.random_range(0..45));
                        let with_alert = rng.random_bool(0.5);
                        let kind = TicketKind::ALL[rng.random_range(0..TicketKind::ALL.len())];
                        maintenance::create_ticket(
                            conn,
                            &NewTicket {
                                room_id: Some(room.id),
                                description: Some(TASKS[rng.random_range(0..TASKS.len())].to_string()),
                                kind: Some(kind.as_str().to_string()),
                                scheduled_date: Some(scheduled),
                                alert_time: with_alert
                                    .then(|| NaiveTime::from_hms_opt(rng.random_range(7..18), 0, 0))
                                    .flatten(),
                                created_by: Some("demo".to_string()),
                                ..Default::default()
                            },
                        )?;
                        summary.tickets += 1;
                    }
                }
            }
        }
        Ok::<_, crate::error::FacilityError>(())
    })?;

    info!(
        "Demo data: created {} building(s), {} room(s), {} ticket(s) (alerts keyed to day {} onward)",
        summary.buildings,
        summary.rooms,
        summary.tickets,
        today.day()
    );
    Ok(summary)
}

/// Mostly available or occupied, with a tail of rooms out of action.
fn pick_status(rng: &mut SmallRng) -> RoomStatus {
    match rng.random_range(0..100) {
        0..=44 => RoomStatus::Available,
        45..=84 => RoomStatus::Occupied,
        85..=94 => RoomStatus::Maintenance,
        _ => RoomStatus::OutOfService,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn status_mix_is_deterministic() {
        let draw = || {
            let mut rng = SmallRng::seed_from_u64(SEED);
            (0..50).map(|_| pick_status(&mut rng)).collect::<Vec<_>>()
        };
        let first = draw();
        assert_eq!(first, draw());
        assert!(first.contains(&RoomStatus::Available));
        assert!(first.contains(&RoomStatus::Occupied));
    }

    #[test]
    fn seeds_once() {
        let Some(mut conn) = test_connection() else { return };

        let existing: i64 = schema::buildings::table.count().get_result(&mut *conn).unwrap();
        let first = seed(&mut conn).unwrap();
        if existing == 0 {
            assert_eq!(first.buildings, BUILDINGS.len());
            assert_eq!(first.rooms, BUILDINGS.len() * (FLOORS * ROOMS_PER_FLOOR) as usize);
        }
        assert_eq!(seed(&mut conn).unwrap(), SeedSummary::default());
    }
}
