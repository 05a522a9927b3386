//! Day-of-month alert scheduling for maintenance tickets.
//!
//! A sweep picks every open, unfired ticket whose alert is due and flips its
//! flag with a single conditional update, so concurrent sweeps never fire the
//! same ticket twice.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use log::{debug, error, info};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

use crate::db::models as dbm;
use crate::error::{FacilityError, FacilityResult};
use crate::models::facility::{MaintenanceTicket, TicketStatus};
use crate::models::normalize::day_to_column;
use crate::schema;

/// Source of "now" for the scheduler.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// True when the ticket has an unfired alert for today's day of month whose
/// time has been reached. `now` is wall-clock time at the facility.
pub fn is_alert_due(ticket: &MaintenanceTicket, now: NaiveDateTime) -> bool {
    if ticket.alert_fired {
        return false;
    }
    match (ticket.alert_time, ticket.alert_day_of_month) {
        (Some(time), Some(day)) => now.day() == day && now.time() >= time,
        _ => false,
    }
}

/// Flag the alert as emitted. Returns `false` when it had already fired.
pub fn mark_alert_fired(conn: &mut PgConnection, id: i64, now: DateTime<Utc>) -> FacilityResult<bool> {
    use schema::maintenance_tickets::dsl as M;

    let updated = diesel::update(M::maintenance_tickets.filter(M::id.eq(id).and(M::alert_fired.eq(false))))
        .set((M::alert_fired.eq(true), M::alert_fired_at.eq(Some(now))))
        .execute(conn)?;
    if updated > 0 {
        return Ok(true);
    }
    let exists: bool = diesel::select(diesel::dsl::exists(M::maintenance_tickets.find(id))).get_result(conn)?;
    if exists {
        debug!("Alert for ticket {} already fired", id);
        Ok(false)
    } else {
        Err(FacilityError::NotFound {
            entity: "maintenance ticket",
            id,
        })
    }
}

/// Open, unfired tickets whose alert is due at `now`.
pub fn due_alerts(conn: &mut PgConnection, now: NaiveDateTime) -> FacilityResult<Vec<MaintenanceTicket>> {
    use schema::maintenance_tickets::dsl as M;

    let open = TicketStatus::OPEN.iter().map(|s| s.as_str()).collect::<Vec<_>>();
    let rows: Vec<dbm::TicketRow> = M::maintenance_tickets
        .filter(M::alert_fired.eq(false))
        .filter(M::status.eq_any(open))
        .filter(M::alert_time.is_not_null())
        .filter(M::alert_day_of_month.eq(day_to_column(now.day())))
        .select(dbm::TicketRow::as_select())
        .order(M::id.asc())
        .load(conn)?;

    let mut due = Vec::new();
    for row in rows {
        let ticket = MaintenanceTicket::try_from(row)?;
        if ticket.status.is_open() && is_alert_due(&ticket, now) {
            due.push(ticket);
        }
    }
    Ok(due)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredAlert {
    pub ticket_id: i64,
    pub room_id: i64,
    pub description: String,
    pub fired_at: DateTime<Utc>,
}

/// One scheduler pass. Returns only the alerts this pass actually flipped.
pub fn sweep_alerts(conn: &mut PgConnection, now: DateTime<Local>) -> FacilityResult<Vec<FiredAlert>> {
    let fired_at = now.with_timezone(&Utc);
    let mut fired = Vec::new();
    for ticket in due_alerts(conn, now.naive_local())? {
        if mark_alert_fired(conn, ticket.id, fired_at)? {
            info!(
                "Alert: maintenance ticket {} for room {} is due ({})",
                ticket.id, ticket.room_id, ticket.description
            );
            fired.push(FiredAlert {
                ticket_id: ticket.id,
                room_id: ticket.room_id,
                description: ticket.description,
                fired_at,
            });
        }
    }
    debug!("Alert sweep at {} fired {} alert(s)", now, fired.len());
    Ok(fired)
}

/// Sweep forever at a steady cadence. A failed sweep is logged and retried
/// on the next tick.
pub fn run_loop(conn: &mut PgConnection, clock: &dyn Clock, interval: Duration) -> FacilityResult<()> {
    loop {
        let tick_start = Instant::now();

        if let Err(e) = sweep_alerts(conn, clock.now()) {
            error!("Alert sweep failed: {}", e);
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{committing_test_connection, test_connection};
    use crate::models::facility::{NewBuilding, NewRoom, NewTicket, TicketChanges, TicketKind};
    use crate::services::buildings::{create_building, delete_building};
    use crate::services::maintenance::{create_ticket, get_ticket, update_ticket};
    use crate::services::rooms::{create_room, delete_room};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use std::sync::Barrier;

    fn ticket(day: Option<u32>, time: Option<NaiveTime>, fired: bool) -> MaintenanceTicket {
        MaintenanceTicket {
            id: 1,
            room_id: 1,
            description: "Check extinguishers".into(),
            kind: TicketKind::Preventive,
            status: TicketStatus::Pending,
            created_at: Utc::now(),
            scheduled_date: None,
            alert_time: time,
            alert_day_of_month: day,
            alert_fired: fired,
            alert_fired_at: None,
            created_by: "system".into(),
            notes: None,
        }
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn nine() -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(9, 0, 0)
    }

    #[test]
    fn due_on_the_day_once_the_time_has_passed() {
        let t = ticket(Some(15), nine(), false);
        assert!(is_alert_due(&t, at(15, 9, 30)));
        assert!(is_alert_due(&t, at(15, 9, 0)));
        assert!(!is_alert_due(&t, at(15, 8, 30)));
        assert!(!is_alert_due(&t, at(16, 9, 30)));
    }

    #[test]
    fn never_due_when_fired_or_incomplete() {
        assert!(!is_alert_due(&ticket(Some(15), nine(), true), at(15, 9, 30)));
        assert!(!is_alert_due(&ticket(None, nine(), false), at(15, 9, 30)));
        assert!(!is_alert_due(&ticket(Some(15), None, false), at(15, 9, 30)));
    }

    #[test]
    fn day_31_ignores_month() {
        let t = ticket(Some(31), nine(), false);
        let march = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let april_30 = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap().and_hms_opt(10, 0, 0).unwrap();
        assert!(is_alert_due(&t, march));
        assert!(!is_alert_due(&t, april_30));
    }

    fn fixture_ticket(conn: &mut PgConnection, name: &str, day: i32) -> MaintenanceTicket {
        let b = create_building(
            conn,
            &NewBuilding {
                name: Some(name.into()),
                description: None,
            },
        )
        .unwrap();
        let room = create_room(
            conn,
            &NewRoom {
                code: Some("A-1".into()),
                building_id: Some(b.id),
                ..Default::default()
            },
        )
        .unwrap();
        create_ticket(
            conn,
            &NewTicket {
                room_id: Some(room.id),
                description: Some("Test smoke detector".into()),
                alert_time: nine(),
                alert_day_of_month: Some(day),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn mark_alert_fired_is_idempotent() {
        let Some(mut conn) = test_connection() else { return };

        let t = fixture_ticket(&mut conn, "Alerts Idempotent", 15);
        assert!(mark_alert_fired(&mut conn, t.id, Utc::now()).unwrap());
        let first = get_ticket(&mut conn, t.id).unwrap();
        assert!(first.alert_fired);
        assert!(first.alert_fired_at.is_some());

        assert!(!mark_alert_fired(&mut conn, t.id, Utc::now()).unwrap());
        let second = get_ticket(&mut conn, t.id).unwrap();
        assert!(second.alert_fired);
        assert_eq!(second.alert_fired_at, first.alert_fired_at);

        assert!(matches!(
            mark_alert_fired(&mut conn, -5, Utc::now()),
            Err(FacilityError::NotFound { .. })
        ));
    }

    #[test]
    fn sweep_fires_due_open_tickets_once() {
        let Some(mut conn) = test_connection() else { return };

        let due = fixture_ticket(&mut conn, "Alerts Sweep Due", 15);
        let other_day = fixture_ticket(&mut conn, "Alerts Sweep Other", 16);
        let closed = fixture_ticket(&mut conn, "Alerts Sweep Closed", 15);
        update_ticket(
            &mut conn,
            closed.id,
            &TicketChanges {
                status: Some("completed".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let now = Local.with_ymd_and_hms(2024, 7, 15, 9, 30, 0).unwrap();
        let fired = sweep_alerts(&mut conn, now).unwrap();
        let ids = fired.iter().map(|f| f.ticket_id).collect::<Vec<_>>();
        assert!(ids.contains(&due.id));
        assert!(!ids.contains(&other_day.id));
        assert!(!ids.contains(&closed.id));

        let again = sweep_alerts(&mut conn, now).unwrap();
        assert!(!again.iter().any(|f| f.ticket_id == due.id));
    }

    #[test]
    fn concurrent_sweeps_fire_a_ticket_once() {
        let Some(mut conn) = committing_test_connection() else { return };

        let name = format!("Alerts Concurrent {}", Utc::now().timestamp_micros());
        let ticket = fixture_ticket(&mut conn, &name, 15);
        let url = conn.url().to_string();
        let barrier = Barrier::new(2);

        let results = thread::scope(|s| {
            let handles = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        let mut own = PgConnection::establish(&url).unwrap();
                        barrier.wait();
                        mark_alert_fired(&mut own, ticket.id, Utc::now()).unwrap()
                    })
                })
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<bool>>()
        });

        delete_room(&mut conn, ticket.room_id).unwrap();
        let building_id = schema::buildings::table
            .filter(schema::buildings::name.eq(&name))
            .select(schema::buildings::id)
            .first::<i64>(&mut *conn)
            .unwrap();
        delete_building(&mut conn, building_id).unwrap();

        assert_eq!(results.iter().filter(|fired| **fired).count(), 1);
    }
}
