//! Integration tests for Shelfwatch
//!
//! These tests use wiremock for the listing service and product pages, and
//! tempfile for on-disk configs, datasets and run summaries.

mod common;
mod config_tests;
mod dataset_tests;
mod listing_tests;
mod proxy_tests;
mod session_tests;
