//! Step definitions for the capture and clarify workflow scenarios.

pub mod world;

mod given;
mod when;
