pub mod config;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod session_state;
pub mod startup;
pub mod telemetry;
pub mod utils;
