//! Common test utilities and fixtures for elm-intel integration tests
//!
//! This module provides:
//! - `TestRepo` builder for creating Elm projects in temp directories
//! - Custom assertions for validating CLI output
//! - Stand-in compiler and linter scripts

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod assertions;
pub mod test_repo;

pub use assertions::*;
pub use test_repo::TestRepo;
