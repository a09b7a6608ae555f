pub mod app;
pub mod config;
pub mod shutdown;
pub mod workload;
