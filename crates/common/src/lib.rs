//! Common utilities and shared types for the travel cost service.
//!
//! This crate provides foundational components used across all crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Rejections**: Named reasons a lifecycle intent is turned down, via [`RejectionReason`]
//! - **Text**: Localized display strings via [`TextCatalog`]
//!
//! # Example
//!
//! ```no_run
//! use travel_cost_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Directory at {}", config.person_directory.base_url);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod text;

pub use config::{Config, ConsentPolicy, LogFormat};
pub use error::{AppError, AppResult, RejectionReason};
pub use text::{Locale, TextCatalog, TextKey};
