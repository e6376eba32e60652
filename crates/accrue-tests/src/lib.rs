//! Integration test support for Accrue.

pub mod helpers;
