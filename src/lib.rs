pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod settings;
pub mod signals;
pub mod step;
pub mod ui;
