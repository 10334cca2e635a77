//! logdash - live dashboard for a web-server log monitoring API
//!
//! Polls the log API for statistics and log pages, renders them into an
//! in-memory document and streams the changed parts to browsers:
//! - Stats polling with in-flight protection
//! - Filterable, paginated log search
//! - Chart.js configs for traffic charts

pub mod api;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod state;
pub mod view;
pub mod web;
