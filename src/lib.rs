pub mod boards;
pub mod config;
pub mod errors;
pub mod logging;
