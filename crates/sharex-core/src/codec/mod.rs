//! Payload encodings shared by the SDK operations.

pub mod dot_notation;

pub use dot_notation::{flatten, flatten_with_prefix};
