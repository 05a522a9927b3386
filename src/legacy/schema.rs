//! Legacy store tables (SQLite). Read-only from this crate's point of view.

diesel::table! {
    edificios (id) {
        id -> BigInt,
        nombre -> Text,
        descripcion -> Nullable<Text>,
        fecha_creacion -> Nullable<Text>,
    }
}

diesel::table! {
    habitaciones (id) {
        id -> BigInt,
        edificio_id -> BigInt,
        numero -> Nullable<Text>,
        nombre -> Nullable<Text>,
        descripcion -> Nullable<Text>,
        estado -> Nullable<Text>,
        fecha_creacion -> Nullable<Text>,
    }
}

diesel::table! {
    mantenimientos (id) {
        id -> BigInt,
        habitacion_id -> BigInt,
        descripcion -> Nullable<Text>,
        tipo -> Nullable<Text>,
        estado -> Nullable<Text>,
        fecha_registro -> Nullable<Text>,
        fecha_programada -> Nullable<Text>,
        hora_alerta -> Nullable<Text>,
        dia_alerta -> Nullable<Text>,
        alerta_emitida -> Nullable<Integer>,
        fecha_alerta_emitida -> Nullable<Text>,
        usuario_creador -> Nullable<Text>,
        notas -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(edificios, habitaciones, mantenimientos,);

/// Tables the reconciliation job expects to find.
pub const TABLES: &[&str] = &["edificios", "habitaciones", "mantenimientos"];
