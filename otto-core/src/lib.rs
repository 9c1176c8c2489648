//! Otto Core
//!
//! Core types and abstractions for the Otto CI/CD service.
//!
//! This crate contains:
//! - Domain types: webhook bindings, pipeline runs, pipeline definitions, log lines
//! - DTOs: request/response bodies shared by the orchestrator, client and CLI
//! - GitHub: the subset of the push webhook payload the orchestrator consumes
//! - Log view: filtering, literal search and result navigation over run logs

pub mod domain;
pub mod dto;
pub mod github;
pub mod logview;
