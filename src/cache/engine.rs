//! Per-device engine cache.
//!
//! One directory holds the active engine (the file the inference program
//! loads) plus one cached copy per device name:
//!
//! ```text
//! engine_dir/
//!   unet_work.engine              <- active slot
//!   unet_work_RTX_3090.engine     <- cache entry for "RTX 3090"
//!   unet_work_NVIDIA_H100.engine
//! ```
//!
//! [`EngineCache::ensure`] restores the device's entry into the active slot,
//! or builds once and persists the result. No lock is taken; one operator
//! runs one launcher at a time.

use std::fs::FileTimes;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::builder::BuildInvoker;
use crate::config::EngineConfig;
use crate::gpu::Device;
use crate::process::RunnerError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine compilation failed (exit code {code:?})")]
    BuildFailed { code: Option<i32> },

    #[error("build finished but {0} was not found")]
    BuildOutputMissing(PathBuf),

    #[error("could not run engine build: {0}")]
    Runner(#[from] RunnerError),

    #[error("I/O error copying {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How the active engine came to match the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A cached engine was copied into the active slot.
    Restored { cache_path: PathBuf },
    /// No cache entry existed; the engine was built and cached.
    Built { cache_path: PathBuf },
}

impl EnsureOutcome {
    pub fn cache_path(&self) -> &Path {
        match self {
            Self::Restored { cache_path } | Self::Built { cache_path } => cache_path,
        }
    }
}

/// Maps devices to cached engine files in a single directory.
#[derive(Debug, Clone)]
pub struct EngineCache {
    engine_dir: PathBuf,
    active_name: String,
}

impl EngineCache {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            engine_dir: config.engine_dir.clone(),
            active_name: config.active_name.clone(),
        }
    }

    /// Path of the engine the inference program loads.
    pub fn active_path(&self) -> PathBuf {
        self.engine_dir.join(&self.active_name)
    }

    /// Cache file name for `device`: the active name with `_<key>` spliced
    /// in before the extension.
    pub fn cache_file_name(&self, device: &Device) -> String {
        let active = Path::new(&self.active_name);
        let stem = active
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = device.cache_key();

        match active.extension() {
            Some(ext) => format!("{stem}_{key}.{}", ext.to_string_lossy()),
            None => format!("{stem}_{key}"),
        }
    }

    /// Path of the cache entry for `device`.
    pub fn cache_path(&self, device: &Device) -> PathBuf {
        self.engine_dir.join(self.cache_file_name(device))
    }

    /// Whether an engine has already been built for `device`'s model.
    pub async fn is_cached(&self, device: &Device) -> bool {
        fs::try_exists(self.cache_path(device)).await.unwrap_or(false)
    }

    /// Make the active engine match `device`, building at most once.
    pub async fn ensure(
        &self,
        device: &Device,
        builder: &BuildInvoker<'_>,
    ) -> Result<EnsureOutcome, EngineError> {
        let active_path = self.active_path();
        let cache_path = self.cache_path(device);

        if self.is_cached(device).await {
            info!(
                device = %device.name,
                cache = %cache_path.display(),
                "Found cached engine, restoring"
            );
            copy_with_metadata(&cache_path, &active_path).await?;
            return Ok(EnsureOutcome::Restored { cache_path });
        }

        warn!(device = %device.name, "No engine found for device");

        let report = builder.build(device).await?;
        if !report.success() {
            return Err(EngineError::BuildFailed { code: report.code });
        }

        if !fs::try_exists(&active_path).await.unwrap_or(false) {
            return Err(EngineError::BuildOutputMissing(active_path));
        }

        info!(cache = %cache_path.display(), "Caching new engine");
        copy_with_metadata(&active_path, &cache_path).await?;
        Ok(EnsureOutcome::Built { cache_path })
    }
}

/// Copy `from` over `to`, keeping permissions and access/modification times.
async fn copy_with_metadata(from: &Path, to: &Path) -> Result<(), EngineError> {
    let io_err = |source| EngineError::Io {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    // A read-only engine left in the slot by an earlier restore cannot be
    // opened for writing; replace it instead.
    if let Ok(existing) = fs::metadata(to).await {
        if existing.permissions().readonly() {
            fs::remove_file(to).await.map_err(io_err)?;
        }
    }

    let bytes = fs::copy(from, to).await.map_err(io_err)?;

    let meta = fs::metadata(from).await.map_err(io_err)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed().map_err(io_err)?)
        .set_modified(meta.modified().map_err(io_err)?);

    // Setting explicit times only needs ownership, so a read-only handle
    // works for engines copied from 0444 cache entries.
    let file = fs::File::open(to).await.map_err(io_err)?.into_std().await;
    file.set_times(times).map_err(io_err)?;

    debug!(
        from = %from.display(),
        to = %to.display(),
        bytes,
        "Copied engine"
    );
    Ok(())
}
