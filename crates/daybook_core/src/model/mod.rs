//! Record-shape helpers for the schema-less namespace.
//!
//! # Responsibility
//! - Define the fixed collection-key contract shared with UI collaborators.
//! - Validate record shape at the boundary instead of assuming structure
//!   everywhere downstream.
//!
//! # Invariants
//! - A well-formed record carries a non-empty string `id`.
//! - Time-windowed logic uses the `date`/`createdAt`/`dueDate` precedence.

pub mod record;
