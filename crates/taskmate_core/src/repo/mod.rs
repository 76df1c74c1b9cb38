//! Account Store and Task Store: data access contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Each repository call is a single-record operation; no cross-record
//!   transactions are required.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidOwner`,
//!   `DuplicateUsername`) in addition to DB transport errors.

pub mod account_repo;
pub mod error;
mod support;
pub mod task_repo;
