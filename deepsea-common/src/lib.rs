//! # Deepsea Common Library
//!
//! Shared code for the Deepsea kiosk services including:
//! - Error type and result alias
//! - Configuration loading (TOML + root folder resolution)
//! - Event types (DeepseaEvent enum) and the EventBus
//! - API view types shared with rendering clients
//! - SSE helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
