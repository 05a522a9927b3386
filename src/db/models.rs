//! Diesel row structs for the canonical store.
//!
//! Enum-like columns are plain text here; conversion into the typed domain
//! entities happens in [`crate::models::facility`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;

use crate::schema;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::buildings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BuildingRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::buildings)]
pub struct NewBuildingRow {
    pub name: String,
    pub description: Option<String>,
}

/// Building carried over from the legacy store with its original id.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = schema::buildings)]
pub struct MigratedBuildingRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = schema::rooms)]
#[diesel(belongs_to(BuildingRow, foreign_key = building_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoomRow {
    pub id: i64,
    pub building_id: i64,
    pub code: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::rooms)]
pub struct NewRoomRow {
    pub building_id: i64,
    pub code: String,
    pub description: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::rooms)]
pub struct RoomChangeset {
    pub building_id: Option<i64>,
    pub code: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = schema::rooms)]
pub struct MigratedRoomRow {
    pub id: i64,
    pub building_id: i64,
    pub code: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = schema::maintenance_tickets)]
#[diesel(belongs_to(RoomRow, foreign_key = room_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TicketRow {
    pub id: i64,
    pub room_id: i64,
    pub description: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_date: Option<NaiveDate>,
    pub alert_time: Option<NaiveTime>,
    pub alert_day_of_month: Option<i32>,
    pub alert_fired: bool,
    pub alert_fired_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::maintenance_tickets)]
pub struct NewTicketRow {
    pub room_id: i64,
    pub description: String,
    pub kind: String,
    pub status: String,
    pub scheduled_date: Option<NaiveDate>,
    pub alert_time: Option<NaiveTime>,
    pub alert_day_of_month: Option<i32>,
    pub created_by: String,
    pub notes: Option<String>,
}

/// Field edits for a ticket. The alert flag columns are only set when the
/// alert is being rescheduled.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::maintenance_tickets)]
pub struct TicketChangeset {
    pub description: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub alert_time: Option<Option<NaiveTime>>,
    pub alert_day_of_month: Option<Option<i32>>,
    pub alert_fired: Option<bool>,
    pub alert_fired_at: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
}

impl TicketChangeset {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.kind.is_none()
            && self.status.is_none()
            && self.scheduled_date.is_none()
            && self.alert_time.is_none()
            && self.alert_day_of_month.is_none()
            && self.alert_fired.is_none()
            && self.alert_fired_at.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = schema::maintenance_tickets)]
pub struct MigratedTicketRow {
    pub id: i64,
    pub room_id: i64,
    pub description: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_date: Option<NaiveDate>,
    pub alert_time: Option<NaiveTime>,
    pub alert_day_of_month: Option<i32>,
    pub alert_fired: bool,
    pub alert_fired_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub notes: Option<String>,
}
