//! innostat - statistical analysis of enterprise survey indicators
//!
//! Four stages over one in-memory survey export:
//!
//! 1. [`cleaner`] filters the raw export to the target country and year and
//!    coerces numeric columns, dropping incomplete records.
//! 2. [`aggregate`] pivots records into a segment × indicator table.
//! 3. [`correlation`] computes the Pearson matrix across segments.
//! 4. [`significance`] tests each coefficient with a two-tailed Student t-test.
//!
//! [`overview`] summarizes the cleaned records before aggregation, and
//! [`pipeline`] chains the stages; the `innostat` binary exposes each one as
//! a subcommand.

pub mod aggregate;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod correlation;
pub mod csv_input;
pub mod csv_output;
pub mod error;
pub mod json_output;
pub mod overview;
pub mod pipeline;
pub mod record;
pub mod significance;
