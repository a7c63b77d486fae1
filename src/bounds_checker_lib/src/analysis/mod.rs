//! Modules implementing analyses on top of the abstract domains.

pub mod buffer_overrun;
