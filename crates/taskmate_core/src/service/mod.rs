//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate account and task stores into use-case level APIs.
//! - Keep the presentation shell decoupled from storage details.

pub mod task_service;
