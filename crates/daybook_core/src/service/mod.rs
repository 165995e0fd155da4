//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store reads/writes into the analytics, repair, backup and
//!   insight contracts UI collaborators consume.
//! - Keep UI layers decoupled from storage and codec details.

pub mod analytics;
pub mod backup;
pub mod insight;
pub mod integrity;
