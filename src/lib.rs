//! Core library for the reservation-tools command line application.
//!
//! A run reads reservations from a table store, finds reservations that book
//! the same resource at overlapping times, and reports them. Store adapters
//! and report writers live under [`io`], record types in [`model`], the
//! record conversion in [`loader`], the pairwise check in [`detect`], and
//! rendering in [`report`]. [`check`] wires the steps together.

pub mod check;
pub mod config;
pub mod detect;
pub mod error;
pub mod io;
pub mod loader;
pub mod logging;
pub mod model;
pub mod report;

pub use error::{Result, ToolError};
