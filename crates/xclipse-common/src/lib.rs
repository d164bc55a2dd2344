//! Shared helpers for the Xclipse layer crates: logging bootstrap and
//! platform conventions.

pub mod logging;
pub mod platform;
