pub mod analytics;
pub mod bootstrap;
pub mod commands;
