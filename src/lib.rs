//! Clarify: capture, clarify, and organize personal tasks.
//!
//! This crate provides the data core of a personal task manager: tasks are
//! captured into an inbox, clarified by assigning a context (where or how the
//! work can be done) or a project (what it belongs to), completed, and browsed
//! through derived views. Presentation layers hold one [`TaskStore`] and call
//! its operations; the store keeps the collections in memory and persists the
//! full snapshot in the background after every change.
//!
//! # Architecture
//!
//! Clarify follows hexagonal architecture principles:
//!
//! - **Domain**: Pure records and queries with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (memory, files)
//!
//! # Modules
//!
//! - [`organizer`]: Tasks, projects, contexts, persistence, and the store
//!
//! [`TaskStore`]: organizer::services::TaskStore

pub mod organizer;
