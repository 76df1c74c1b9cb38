//! Named record types for accounts and tasks.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field-level validation and the pure display classification.
//!
//! # Invariants
//! - Every record is identified by a stable, system-generated `Uuid`.
//! - A task belongs to exactly one account for its whole lifetime.

pub mod account;
pub mod task;
