pub mod cascade;
pub mod clamp;
pub mod conflict;
pub mod error;
pub mod layout;
pub mod models;
pub mod schedule;
pub mod time;
