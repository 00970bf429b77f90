//! Core of the calgrid calendar front-end.
//!
//! This crate provides everything below the terminal UI:
//! - `store`: the calendar store seam and an in-process store
//! - `gateway`: typed reads and writes against a store
//! - `state`: the observable presentation state and its worker
//! - `screen`: the month screen controller, gestures and cell annotations
//! - `grid` and `bucket`: month grid layout and events grouped by date

pub mod bucket;
pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod gateway;
pub mod grid;
pub mod permission;
pub mod recurrence;
pub mod screen;
pub mod state;
pub mod store;

// Re-export all event types at crate root for convenience
pub use event::*;
