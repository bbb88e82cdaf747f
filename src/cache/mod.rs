//! Compiled engine management.
//!
//! - [`engine`]: Per-device engine cache and the restore/build decision
//! - [`builder`]: Device-scoped invocation of the external engine build

pub mod builder;
pub mod engine;
