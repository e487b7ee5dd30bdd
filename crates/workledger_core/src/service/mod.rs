//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI/API layers decoupled from storage details.

pub mod authority_service;
pub mod schedule_service;
pub mod work_service;
