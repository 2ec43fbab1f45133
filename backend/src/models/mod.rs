//! Database models for the Mandi Trade Management Platform
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
