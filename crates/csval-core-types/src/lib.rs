//! Core types shared across csval facilities
//!
//! This crate provides foundational types used by the validator, its error
//! facility and its logging facility:
//!
//! - **Correlation types**: RequestId, TraceId, ValidationContext
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestId, TraceId, ValidationContext};
