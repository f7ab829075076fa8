//! Core business logic for the travel cost service.

pub mod services;
pub mod validation;

pub use services::*;
