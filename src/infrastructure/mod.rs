pub mod config;
pub mod error;
pub mod task_store;
