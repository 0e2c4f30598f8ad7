pub mod config;
pub mod display;
pub mod items;
pub mod signal;
pub mod telemetry;
