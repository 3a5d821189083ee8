//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the remote catalog and drive
//! the full listing -> extraction -> download -> storage cycle.

mod crawl_tests;
mod transport_tests;
