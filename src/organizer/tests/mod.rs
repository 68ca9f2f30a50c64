//! Unit tests for the organizer module.

mod support;
