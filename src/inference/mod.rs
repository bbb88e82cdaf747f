//! Launching the downstream inference program.
//!
//! - [`launcher`]: Device-scoped inference invocation with acceleration flag injection

pub mod launcher;
