//! Otto orchestrator
//!
//! Receives GitHub push webhooks, matches them against pipeline bindings and
//! records the resulting pipeline runs.

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod state;
