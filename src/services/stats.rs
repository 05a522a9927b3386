//! Room status statistics and the dashboard view built on top of them.

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;

use crate::error::FacilityResult;
use crate::models::facility::RoomStatus;
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusStatistic {
    pub status: RoomStatus,
    pub count: u64,
    /// Share of all rooms, one decimal place.
    pub percentage: f64,
}

/// Per-status counts, always covering all four statuses in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusStatistics {
    pub total: u64,
    pub statuses: Vec<StatusStatistic>,
}

impl StatusStatistics {
    pub fn get(&self, status: RoomStatus) -> Option<&StatusStatistic> {
        self.statuses.iter().find(|s| s.status == status)
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Build statistics from raw `(status, count)` pairs. Missing statuses count as zero.
pub fn statistics_from_counts(counts: &[(RoomStatus, u64)]) -> StatusStatistics {
    let total: u64 = counts.iter().map(|(_, c)| c).sum();
    let statuses = RoomStatus::ALL
        .iter()
        .map(|&status| {
            let count: u64 = counts.iter().filter(|(s, _)| *s == status).map(|(_, c)| c).sum();
            StatusStatistic {
                status,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();
    StatusStatistics { total, statuses }
}

pub fn compute_status_statistics(conn: &mut PgConnection) -> FacilityResult<StatusStatistics> {
    use schema::rooms::dsl as R;

    let rows: Vec<(String, i64)> = R::rooms
        .group_by(R::status)
        .select((R::status, count_star()))
        .load(conn)?;
    let counts = rows
        .into_iter()
        .map(|(status, count)| Ok((status.parse::<RoomStatus>()?, count.max(0) as u64)))
        .collect::<FacilityResult<Vec<_>>>()?;
    Ok(statistics_from_counts(&counts))
}

/// Display metadata for one room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPresentation {
    pub status: RoomStatus,
    pub label: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub icon: &'static str,
    /// Lower sorts first on the dashboard.
    pub priority: u8,
}

const STATUS_PRESENTATION: [StatusPresentation; 4] = [
    StatusPresentation {
        status: RoomStatus::Available,
        label: "Available",
        primary_color: "#16a34a",
        secondary_color: "#dcfce7",
        icon: "check-circle",
        priority: 4,
    },
    StatusPresentation {
        status: RoomStatus::Occupied,
        label: "Occupied",
        primary_color: "#2563eb",
        secondary_color: "#dbeafe",
        icon: "user",
        priority: 3,
    },
    StatusPresentation {
        status: RoomStatus::Maintenance,
        label: "Under maintenance",
        primary_color: "#d97706",
        secondary_color: "#fef3c7",
        icon: "wrench",
        priority: 2,
    },
    StatusPresentation {
        status: RoomStatus::OutOfService,
        label: "Out of service",
        primary_color: "#dc2626",
        secondary_color: "#fee2e2",
        icon: "ban",
        priority: 1,
    },
];

/// Static, ordered presentation config; not derived from the store.
pub fn status_presentation_config() -> &'static [StatusPresentation] {
    &STATUS_PRESENTATION
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    pub status: RoomStatus,
    pub count: u64,
    pub percentage: f64,
    pub presentation: StatusPresentation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total: u64,
    pub entries: Vec<DashboardEntry>,
}

/// Join statistics with presentation metadata, keyed by status.
pub fn merge_dashboard(stats: &StatusStatistics, config: &[StatusPresentation]) -> Dashboard {
    let entries = config
        .iter()
        .map(|p| {
            let (count, percentage) = stats.get(p.status).map(|s| (s.count, s.percentage)).unwrap_or((0, 0.0));
            DashboardEntry {
                status: p.status,
                count,
                percentage,
                presentation: *p,
            }
        })
        .collect();
    Dashboard {
        total: stats.total,
        entries,
    }
}

pub fn dashboard(conn: &mut PgConnection) -> FacilityResult<Dashboard> {
    let stats = compute_status_statistics(conn)?;
    Ok(merge_dashboard(&stats, status_presentation_config()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::facility::{NewBuilding, NewRoom};
    use crate::services::buildings::create_building;
    use crate::services::rooms::create_room;

    #[test]
    fn two_available_one_occupied() {
        let stats = statistics_from_counts(&[(RoomStatus::Available, 2), (RoomStatus::Occupied, 1)]);
        assert_eq!(stats.total, 3);
        let pairs = stats
            .statuses
            .iter()
            .map(|s| (s.status, s.count, s.percentage))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                (RoomStatus::Available, 2, 66.7),
                (RoomStatus::Occupied, 1, 33.3),
                (RoomStatus::Maintenance, 0, 0.0),
                (RoomStatus::OutOfService, 0, 0.0),
            ]
        );
    }

    #[test]
    fn empty_store_reports_zeroes() {
        let stats = statistics_from_counts(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.statuses.len(), 4);
        assert!(stats.statuses.iter().all(|s| s.count == 0 && s.percentage == 0.0));
    }

    #[test]
    fn presentation_covers_every_status_in_order() {
        let statuses = status_presentation_config().iter().map(|p| p.status).collect::<Vec<_>>();
        assert_eq!(statuses, RoomStatus::ALL.to_vec());
    }

    #[test]
    fn dashboard_merges_without_touching_inputs() {
        let stats = statistics_from_counts(&[(RoomStatus::Maintenance, 1), (RoomStatus::Available, 3)]);
        let before = stats.clone();
        let board = merge_dashboard(&stats, status_presentation_config());
        assert_eq!(stats, before);
        assert_eq!(board.total, 4);
        let maintenance = board.entries.iter().find(|e| e.status == RoomStatus::Maintenance).unwrap();
        assert_eq!(maintenance.count, 1);
        assert_eq!(maintenance.percentage, 25.0);
        assert_eq!(maintenance.presentation.icon, "wrench");
    }

    #[test]
    fn statistics_from_store_group_by_status() {
        let Some(mut conn) = test_connection() else { return };

        // Start from an empty rooms table; the test transaction restores it.
        diesel::delete(schema::rooms::table).execute(&mut *conn).unwrap();
        let building = create_building(
            &mut conn,
            &NewBuilding {
                name: Some("Stats Wing".into()),
                description: None,
            },
        )
        .unwrap();
        for (code, status) in [("S-1", "available"), ("S-2", "available"), ("S-3", "occupied")] {
            create_room(
                &mut conn,
                &NewRoom {
                    code: Some(code.into()),
                    building_id: Some(building.id),
                    status: Some(status.into()),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let stats = compute_status_statistics(&mut conn).unwrap();
        assert_eq!(stats.total, 3);
        let available = stats.get(RoomStatus::Available).unwrap();
        assert_eq!((available.count, available.percentage), (2, 66.7));
        let occupied = stats.get(RoomStatus::Occupied).unwrap();
        assert_eq!((occupied.count, occupied.percentage), (1, 33.3));
        assert_eq!(stats.get(RoomStatus::OutOfService).unwrap().count, 0);

        let board = dashboard(&mut conn).unwrap();
        assert_eq!(board.total, 3);
        assert_eq!(board.entries.len(), 4);
    }
}
