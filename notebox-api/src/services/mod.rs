//! Service Layer
//!
//! Orchestrates persistence with the key-value backed features so route
//! handlers stay thin.

mod note_service;

pub use note_service::*;
