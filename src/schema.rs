//! Canonical store tables, matching `migrations/`.

diesel::table! {
    buildings (id) {
        id -> Int8,
        name -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    rooms (id) {
        id -> Int8,
        building_id -> Int8,
        code -> Text,
        description -> Nullable<Text>,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    maintenance_tickets (id) {
        id -> Int8,
        room_id -> Int8,
        description -> Text,
        kind -> Text,
        status -> Text,
        created_at -> Timestamptz,
        scheduled_date -> Nullable<Date>,
        alert_time -> Nullable<Time>,
        alert_day_of_month -> Nullable<Int4>,
        alert_fired -> Bool,
        alert_fired_at -> Nullable<Timestamptz>,
        created_by -> Text,
        notes -> Nullable<Text>,
    }
}

diesel::joinable!(rooms -> buildings (building_id));
diesel::joinable!(maintenance_tickets -> rooms (room_id));

diesel::allow_tables_to_appear_in_same_query!(buildings, rooms, maintenance_tickets,);
