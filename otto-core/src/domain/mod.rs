//! Core domain types
//!
//! This module contains the core domain structures used across Otto services.
//! They are shared between the orchestrator (which persists them) and the
//! client/CLI (which display them).

pub mod binding;
pub mod log;
pub mod pipeline;
pub mod run;
