//! Integration tests for case-status
//!
//! These tests use wiremock to stand in for the court portal and exercise
//! the full search pipeline end to end.

mod orders_tests;
mod search_tests;
