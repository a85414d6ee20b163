pub mod config;
pub mod errors;
pub mod job_controller;
pub mod services;
pub mod store;
