pub mod config;
pub mod errors;
pub mod logging;
pub mod mapper;
pub mod reconcile;
pub mod tracker;
pub mod ui;
