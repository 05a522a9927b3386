//! Facility state and maintenance reconciliation core for a hotel
//! maintenance tracker: buildings, rooms and tickets in a Postgres store,
//! the room status rules, day-of-month maintenance alerts, dashboard
//! statistics, and the one-shot import from the legacy SQLite store.

pub mod config;
pub mod db;
pub mod error;
pub mod legacy;
pub mod models {
    pub mod facility;
    pub mod normalize;
}
pub mod schema;
pub mod services {
    pub mod alerts;
    pub mod buildings;
    pub mod demo;
    pub mod maintenance;
    pub mod reconcile;
    pub mod rooms;
    pub mod stats;
}
pub mod utils;

pub use error::{FacilityError, FacilityResult, ReconcileError};
