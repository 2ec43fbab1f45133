//! Shared types and models for the Mandi Trade Management Platform
//!
//! This crate contains types shared between the backend, frontend (via WASM),
//! and other components of the system.

pub mod allocation;
pub mod models;
pub mod validation;

pub use allocation::*;
pub use models::*;
pub use validation::*;
