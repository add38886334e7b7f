//! # Takt Common Library
//!
//! Shared code for the Takt competition-management backend:
//! - Database schema, models and queries
//! - Repertoire selection validation (quota + exclusion rules)
//! - Candidate completeness aggregation
//! - Anonymized secret-id registry for blind judging
//! - Configuration loading
//! - Fixed-point piece-value representation

pub mod anonymize;
pub mod completeness;
pub mod config;
pub mod db;
pub mod error;
pub mod repertoire;
pub mod units;

pub use error::{Error, Result};
