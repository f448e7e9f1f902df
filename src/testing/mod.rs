//! Testing utilities and mock implementations
//!
//! Test doubles for the transport layer, used by unit and integration tests.

pub mod mocks;

pub use mocks::{MockTransport, PublishedMessage};
