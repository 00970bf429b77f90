pub mod add;
pub mod calendars;
pub mod config;
pub mod day;
pub mod delete;
pub mod edit;
pub mod month;
pub mod permission;
