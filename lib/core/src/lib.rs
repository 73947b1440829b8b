//! Core domain types and utilities for the courier platform.
//!
//! This crate provides the foundational ID types and error handling
//! shared by the courier automation crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ExecutionId, FlowId, UserId};
