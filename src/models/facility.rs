//! Domain types for buildings, rooms and maintenance tickets.
//!
//! These are the fully-populated shapes every consumer sees. Rows coming out
//! of the canonical store are converted here (see the `TryFrom` impls) and
//! write-side defaults live in [`crate::models::normalize`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::models as dbm;
use crate::error::FacilityError;
use crate::models::normalize;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal, default = $default:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = FacilityError;

            /// Case-insensitive, surrounding whitespace ignored.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                $(
                    if wanted == $text {
                        return Ok($name::$variant);
                    }
                )+
                Err(FacilityError::Validation(format!(
                    "invalid {} {:?} (expected one of: {})",
                    $what,
                    s,
                    [$($text),+].join(", ")
                )))
            }
        }
    };
}

text_enum! {
    /// Operational status of a room.
    RoomStatus, "room status", default = Available {
        Available => "available",
        Occupied => "occupied",
        Maintenance => "maintenance",
        OutOfService => "out_of_service",
    }
}

text_enum! {
    TicketKind, "ticket kind", default = Normal {
        Routine => "routine",
        Normal => "normal",
        Corrective => "corrective",
        Preventive => "preventive",
    }
}

text_enum! {
    TicketStatus, "ticket status", default = Pending {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl RoomStatus {
    /// Operators may move a room between any two statuses except straight
    /// from `out_of_service` back to `occupied`.
    pub fn can_transition_to(self, next: RoomStatus) -> bool {
        !matches!((self, next), (RoomStatus::OutOfService, RoomStatus::Occupied))
    }
}

impl TicketStatus {
    /// Tickets that still take part in the alert sweep.
    pub const OPEN: &'static [TicketStatus] = &[TicketStatus::Pending, TicketStatus::InProgress];

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub building_id: i64,
    pub code: String,
    pub description: Option<String>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

/// A room together with the name of the building that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListing {
    #[serde(flatten)]
    pub room: Room,
    pub building_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceTicket {
    pub id: i64,
    pub room_id: i64,
    pub description: String,
    pub kind: TicketKind,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub scheduled_date: Option<NaiveDate>,
    pub alert_time: Option<NaiveTime>,
    pub alert_day_of_month: Option<u32>,
    pub alert_fired: bool,
    pub alert_fired_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBuilding {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRoom {
    pub code: Option<String>,
    pub building_id: Option<i64>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Partial room update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomChanges {
    pub code: Option<String>,
    pub building_id: Option<i64>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTicket {
    pub room_id: Option<i64>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub alert_time: Option<NaiveTime>,
    pub alert_day_of_month: Option<i32>,
    pub created_by: Option<String>,
    pub notes: Option<String>,
}

/// Partial ticket update; `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketChanges {
    pub description: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub alert_time: Option<Option<NaiveTime>>,
    pub alert_day_of_month: Option<Option<i32>>,
    pub notes: Option<Option<String>>,
}

impl TicketChanges {
    /// Whether applying these changes reschedules the alert.
    pub fn touches_alert(&self) -> bool {
        self.alert_time.is_some() || self.alert_day_of_month.is_some()
    }
}

impl From<dbm::BuildingRow> for Building {
    fn from(row: dbm::BuildingRow) -> Self {
        Building {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<dbm::RoomRow> for Room {
    type Error = FacilityError;

    fn try_from(row: dbm::RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            status: row.status.parse()?,
            id: row.id,
            building_id: row.building_id,
            code: row.code,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<dbm::TicketRow> for MaintenanceTicket {
    type Error = FacilityError;

    fn try_from(row: dbm::TicketRow) -> Result<Self, Self::Error> {
        let alert_day_of_month = row
            .alert_day_of_month
            .map(normalize::check_day_of_month)
            .transpose()?;
        Ok(MaintenanceTicket {
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            alert_day_of_month,
            id: row.id,
            room_id: row.room_id,
            description: row.description,
            created_at: row.created_at,
            scheduled_date: row.scheduled_date,
            alert_time: row.alert_time,
            alert_fired: row.alert_fired,
            alert_fired_at: row.alert_fired_at,
            created_by: row.created_by,
            notes: row.notes,
        })
    }
}
