//! Integration test entry point.
//!
//! These tests exercise a running server at localhost:8080 backed by a real
//! database, so they are ignored by default: `cargo test -- --ignored`.

mod api_tests;
