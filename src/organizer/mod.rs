//! Task, project, and context organization.
//!
//! This module implements the capture/clarify/organize workflow: tasks are
//! captured into an inbox, then assigned a context or a project, completed,
//! and browsed through derived views. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//! - Store configuration in [`config`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
