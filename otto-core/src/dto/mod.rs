//! Data Transfer Objects
//!
//! Request and response bodies exchanged between the orchestrator API and
//! its clients (the HTTP client crate, the CLI, and GitHub itself for the
//! webhook responses). All bodies use camelCase field names on the wire.

pub mod binding;
pub mod log;
pub mod pipeline;
pub mod run;
pub mod webhook;
