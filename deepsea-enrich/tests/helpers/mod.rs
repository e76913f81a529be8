//! Test Helper Utilities
//!
//! Shared utilities for testing deepsea-enrich

#![allow(dead_code, unused_imports)]

pub mod catalog_server;
pub mod fixtures;

pub use catalog_server::{Endpoint, FakeCatalogs, SQUID_PHOTO_URL};
pub use fixtures::{giant_squid_record, memory_viewer, test_app_state, write_dataset, RecordingSink};
