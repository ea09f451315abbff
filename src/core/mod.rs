pub mod calendar;
pub mod chart;
pub mod config;
pub mod formatter;
pub mod gap_fill;
pub mod input;
pub mod models;
pub mod projector;
pub mod session;
pub mod store;
