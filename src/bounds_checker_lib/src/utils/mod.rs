//! This module contains helper functions and structs for logging and debugging.

pub mod debug;
pub mod log;
