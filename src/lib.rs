// Public API for integration tests and potential library usage

pub mod api;
pub mod app;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod modes;
pub mod protocol;
pub mod record;
pub mod registry;
mod runner;
pub mod state;
pub mod types;
pub mod ws;
