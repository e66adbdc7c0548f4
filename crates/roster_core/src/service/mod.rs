//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and ranking calls into use-case level APIs.
//! - Keep the CLI decoupled from storage and collaborator details.

pub mod roster_service;
pub mod session;
