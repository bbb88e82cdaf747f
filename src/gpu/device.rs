//! GPU device records.
//!
//! Devices are rebuilt from the inventory probe on every run; nothing about
//! them is persisted except the engine files keyed by [`Device::cache_key`].

use std::fmt;

/// A single GPU as reported by the inventory command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Physical device index (what the device-restriction variable expects).
    pub index: u32,

    /// Device name (e.g., "NVIDIA GeForce RTX 3090").
    pub name: String,

    /// Total memory as reported (e.g., "24576 MiB").
    pub memory: String,
}

impl Device {
    pub fn new(index: u32, name: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            memory: memory.into(),
        }
    }

    /// Filesystem-safe token identifying this device's engine.
    ///
    /// Keyed by name only: two identical cards share one engine.
    pub fn cache_key(&self) -> String {
        sanitize_name(&self.name)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.memory)
    }
}

/// Replace every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
