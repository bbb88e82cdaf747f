//! engine-launcher: GPU-scoped engine caching and inference launch.
//!
//! Picks one GPU, makes sure the compiled inference engine for that GPU's
//! model is in the active slot (restoring a cached copy or building a new
//! one), then starts the inference program restricted to that GPU.

pub mod cache;
pub mod config;
pub mod gpu;
pub mod inference;
pub mod orchestrator;
pub mod process;
