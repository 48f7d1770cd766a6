//! Public API module.
//!
//! This module contains the high-level user-facing API for the `connmanrs` crate.

pub mod connman;
pub mod models;
