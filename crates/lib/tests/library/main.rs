//! Integration tests for antler-lib.
//!
//! Each module drives complete build files through the public API.

mod build_file_tests;
mod common;
mod execute_tests;
mod macro_tests;
mod property_tests;
