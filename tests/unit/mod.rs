//! Unit test harness for slider-motion.
//!
//! This module organizes unit tests for each component of the library.

mod config_validation;
mod profile_parsing;
