//! Write-side defaulting shared by the entity store and the legacy mapping.
//!
//! Everything that fills in `kind`, `status`, `created_by` or derives the
//! alert day goes through here, so stored rows are always fully populated.

use chrono::{Datelike, NaiveDate, NaiveTime};
use log::warn;

use crate::db::models as dbm;
use crate::error::{FacilityError, FacilityResult};
use crate::models::facility::{NewTicket, TicketKind, TicketStatus};

pub const DEFAULT_CREATED_BY: &str = "system";

/// Trimmed, non-empty text or a validation error naming `field`.
pub fn required_text(field: &str, value: Option<&str>) -> FacilityResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(FacilityError::validation(format!("{field} is required"))),
    }
}

/// Blank optional text collapses to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub fn check_day_of_month(day: i32) -> FacilityResult<u32> {
    match u32::try_from(day) {
        Ok(d @ 1..=31) => Ok(d),
        _ => Err(FacilityError::validation(format!(
            "alert day of month must be between 1 and 31, got {day}"
        ))),
    }
}

/// Kind, status and author with their defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLabels {
    pub kind: TicketKind,
    pub status: TicketStatus,
    pub created_by: String,
}

pub fn ticket_labels(kind: Option<&str>, status: Option<&str>, created_by: Option<&str>) -> FacilityResult<TicketLabels> {
    let kind = match optional_text(kind) {
        Some(k) => k.parse()?,
        None => TicketKind::default(),
    };
    let status = match optional_text(status) {
        Some(s) => s.parse()?,
        None => TicketStatus::default(),
    };
    let created_by = optional_text(created_by).unwrap_or_else(|| DEFAULT_CREATED_BY.to_string());
    Ok(TicketLabels { kind, status, created_by })
}

/// Resolved alert schedule of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertSchedule {
    pub time: Option<NaiveTime>,
    pub day_of_month: Option<u32>,
}

/// Resolve the alert day, deriving it from `scheduled_date` when only a time
/// was given.
///
/// Only the calendar day survives the derivation: month and year are dropped,
/// so a ticket scheduled on the 31st comes due in every month that has one.
/// A time with no resolvable day is dropped, leaving no alert.
pub fn alert_schedule(
    time: Option<NaiveTime>,
    explicit_day: Option<i32>,
    scheduled_date: Option<NaiveDate>,
) -> FacilityResult<AlertSchedule> {
    let explicit_day = explicit_day.map(check_day_of_month).transpose()?;
    let day_of_month = match (time, explicit_day) {
        (_, Some(day)) => Some(day),
        (Some(_), None) => scheduled_date.map(|d| d.day()),
        (None, None) => None,
    };
    if time.is_some() && day_of_month.is_none() {
        warn!("Alert time given without a day of month or scheduled date; no alert will be scheduled");
        return Ok(AlertSchedule { time: None, day_of_month: None });
    }
    Ok(AlertSchedule { time, day_of_month })
}

/// Build the insert row for a new ticket. The room reference is checked by the caller.
pub fn new_ticket_row(input: &NewTicket) -> FacilityResult<dbm::NewTicketRow> {
    let room_id = input
        .room_id
        .ok_or_else(|| FacilityError::validation("room id is required"))?;
    let description = required_text("description", input.description.as_deref())?;
    let labels = ticket_labels(input.kind.as_deref(), input.status.as_deref(), input.created_by.as_deref())?;
    let alert = alert_schedule(input.alert_time, input.alert_day_of_month, input.scheduled_date)?;

    Ok(dbm::NewTicketRow {
        room_id,
        description,
        kind: labels.kind.as_str().to_string(),
        status: labels.status.as_str().to_string(),
        scheduled_date: input.scheduled_date,
        alert_time: alert.time,
        alert_day_of_month: alert.day_of_month.map(day_to_column),
        created_by: labels.created_by,
        notes: optional_text(input.notes.as_deref()),
    })
}

/// Days are validated to 1..=31 before they reach a column.
pub(crate) fn day_to_column(day: u32) -> i32 {
    day as i32
}
