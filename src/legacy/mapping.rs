//! Pure legacy → canonical record mapping. No store access happens here.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{LegacyBuilding, LegacyRoom, LegacyTicket};
use crate::db::models::{MigratedBuildingRow, MigratedRoomRow, MigratedTicketRow};
use crate::models::facility::RoomStatus;
use crate::models::normalize::{self, day_to_column};
use crate::utils::{parse_alert_day, parse_legacy_date, parse_legacy_timestamp, parse_time_of_day};

/// Why a single legacy record could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MappingError(pub String);

type Mapped<T> = Result<T, MappingError>;

fn bad(msg: impl Into<String>) -> MappingError {
    MappingError(msg.into())
}

/// Absent timestamps take `fallback` (the canonical column default); malformed ones fail.
fn timestamp(field: &str, raw: Option<&str>, fallback: DateTime<Utc>) -> Mapped<DateTime<Utc>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(fallback),
        Some(s) => parse_legacy_timestamp(s).ok_or_else(|| bad(format!("unparseable {field} {s:?}"))),
    }
}

fn optional_timestamp(field: &str, raw: Option<&str>) -> Mapped<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_legacy_timestamp(s)
            .map(Some)
            .ok_or_else(|| bad(format!("unparseable {field} {s:?}"))),
    }
}

/// Legacy rows may carry Spanish enum labels. Known ones are rewritten to
/// the canonical spelling; anything else passes through for the enum parser
/// to accept or reject.
fn canonical_label(raw: Option<&str>) -> Option<String> {
    let label = normalize::optional_text(raw)?;
    let key = label.to_lowercase().replace([' ', '-'], "_");
    let canonical = match key.as_str() {
        "disponible" | "libre" => "available",
        "ocupada" | "ocupado" => "occupied",
        "mantenimiento" | "en_mantenimiento" => "maintenance",
        "fuera_de_servicio" => "out_of_service",
        "rutina" | "rutinario" => "routine",
        "correctivo" => "corrective",
        "preventivo" => "preventive",
        "pendiente" => "pending",
        "en_progreso" | "en_proceso" => "in_progress",
        "completado" | "completada" | "terminado" => "completed",
        "cancelado" | "cancelada" => "cancelled",
        _ => return Some(label),
    };
    Some(canonical.to_string())
}

pub fn map_building(row: &LegacyBuilding, now: DateTime<Utc>) -> Mapped<MigratedBuildingRow> {
    let name = normalize::required_text("nombre", Some(&row.nombre)).map_err(|e| bad(e.to_string()))?;
    Ok(MigratedBuildingRow {
        id: row.id,
        name,
        description: normalize::optional_text(row.descripcion.as_deref()),
        created_at: timestamp("fecha_creacion", row.fecha_creacion.as_deref(), now)?,
    })
}

pub fn map_room(row: &LegacyRoom, now: DateTime<Utc>) -> Mapped<MigratedRoomRow> {
    let code = normalize::optional_text(row.numero.as_deref())
        .or_else(|| normalize::optional_text(row.nombre.as_deref()))
        .ok_or_else(|| bad("room has neither numero nor nombre"))?;
    let status = match canonical_label(row.estado.as_deref()) {
        Some(s) => s.parse::<RoomStatus>().map_err(|e| bad(e.to_string()))?,
        None => RoomStatus::default(),
    };
    Ok(MigratedRoomRow {
        id: row.id,
        building_id: row.edificio_id,
        code,
        description: normalize::optional_text(row.descripcion.as_deref()),
        status: status.as_str().to_string(),
        created_at: timestamp("fecha_creacion", row.fecha_creacion.as_deref(), now)?,
    })
}

pub fn map_ticket(row: &LegacyTicket, now: DateTime<Utc>) -> Mapped<MigratedTicketRow> {
    let description =
        normalize::required_text("descripcion", row.descripcion.as_deref()).map_err(|e| bad(e.to_string()))?;
    let kind = canonical_label(row.tipo.as_deref());
    let status = canonical_label(row.estado.as_deref());
    let labels = normalize::ticket_labels(kind.as_deref(), status.as_deref(), row.usuario_creador.as_deref())
        .map_err(|e| bad(e.to_string()))?;

    let scheduled_date = match normalize::optional_text(row.fecha_programada.as_deref()) {
        None => None,
        Some(s) => Some(parse_legacy_date(&s).ok_or_else(|| bad(format!("unparseable fecha_programada {s:?}")))?),
    };
    let alert_time = match normalize::optional_text(row.hora_alerta.as_deref()) {
        None => None,
        Some(s) => Some(parse_time_of_day(&s).ok_or_else(|| bad(format!("unparseable hora_alerta {s:?}")))?),
    };
    let explicit_day = match normalize::optional_text(row.dia_alerta.as_deref()) {
        None => None,
        Some(s) => {
            let day = parse_alert_day(&s).ok_or_else(|| bad(format!("unparseable dia_alerta {s:?}")))?;
            Some(day_to_column(day))
        }
    };
    let alert =
        normalize::alert_schedule(alert_time, explicit_day, scheduled_date).map_err(|e| bad(e.to_string()))?;

    Ok(MigratedTicketRow {
        id: row.id,
        room_id: row.habitacion_id,
        description,
        kind: labels.kind.as_str().to_string(),
        status: labels.status.as_str().to_string(),
        created_at: timestamp("fecha_registro", row.fecha_registro.as_deref(), now)?,
        scheduled_date,
        alert_time: alert.time,
        alert_day_of_month: alert.day_of_month.map(day_to_column),
        alert_fired: row.alerta_emitida.unwrap_or(0) != 0,
        alert_fired_at: optional_timestamp("fecha_alerta_emitida", row.fecha_alerta_emitida.as_deref())?,
        created_by: labels.created_by,
        notes: normalize::optional_text(row.notas.as_deref()),
    })
}
