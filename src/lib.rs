// src/lib.rs

pub mod common;
pub mod config;
pub mod geo;
pub mod location;
pub mod models;
pub mod services;
pub mod store;

pub use common::error::AppError;
pub use config::{AppState, Settings};
