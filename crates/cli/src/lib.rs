//! minx CLI library
//!
//! Exposes the command layer so integration tests can drive it directly.

pub mod commands;
pub mod exit_code;
pub mod output;
