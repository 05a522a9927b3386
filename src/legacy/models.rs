use diesel::prelude::*;

use super::schema;

/// A building as the legacy store keeps it.
#[derive(Debug, Clone, Default, Queryable, Selectable)]
#[diesel(table_name = schema::edificios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LegacyBuilding {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub fecha_creacion: Option<String>,
}

/// A room as the legacy store keeps it. Older rows carry the room label in
/// `nombre` instead of `numero`.
#[derive(Debug, Clone, Default, Queryable, Selectable)]
#[diesel(table_name = schema::habitaciones)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LegacyRoom {
    pub id: i64,
    pub edificio_id: i64,
    pub numero: Option<String>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub estado: Option<String>,
    pub fecha_creacion: Option<String>,
}

#[derive(Debug, Clone, Default, Queryable, Selectable)]
#[diesel(table_name = schema::mantenimientos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LegacyTicket {
    pub id: i64,
    pub habitacion_id: i64,
    pub descripcion: Option<String>,
    pub tipo: Option<String>,
    pub estado: Option<String>,
    pub fecha_registro: Option<String>,
    pub fecha_programada: Option<String>,
    pub hora_alerta: Option<String>,
    /// Day number or a full date.
    pub dia_alerta: Option<String>,
    /// 0/1 flag.
    pub alerta_emitida: Option<i32>,
    pub fecha_alerta_emitida: Option<String>,
    pub usuario_creador: Option<String>,
    pub notas: Option<String>,
}
