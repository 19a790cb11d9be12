//! Unit tests for the campfire CLI.
//!
//! These exercise the library crate directly: services against the
//! file-backed inventory, structural checks, and property tests. No binary
//! is spawned.

mod architecture;
mod property_tests;
mod scenarios;
