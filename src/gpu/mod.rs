//! GPU discovery and selection.
//!
//! - [`device`]: Device records and cache-key sanitization
//! - [`probe`]: Inventory via the external device-listing command
//! - [`selector`]: Explicit, automatic or interactive device choice

pub mod device;
pub mod probe;
pub mod selector;

pub use device::{sanitize_name, Device};
