//! Content-hash cache for compiled modules.
//!
//! One JSON entry per view, keyed by view name and validated by a SHA-256
//! over the compiler version, the shared wrapper resources and the template
//! source, so unchanged templates skip recompilation.

use crate::validate::{CompileError, CompiledModule, Result};
use crate::wrapper::WrapperResources;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub module: CompiledModule,
}

#[derive(Debug, Clone)]
pub struct CompileCache {
    cache_dir: PathBuf,
}

impl CompileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).map_err(|e| CompileError::io(&cache_dir, e))?;
        }
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Hash an entry is validated against. Any change to the compiler or the
    /// wrapper resources invalidates every entry.
    pub fn entry_hash(source: &str, resources: &WrapperResources) -> String {
        let mut hasher = Sha256::new();
        for part in [
            env!("CARGO_PKG_VERSION"),
            resources.function_content.as_str(),
            resources.config_content.as_str(),
            source,
        ] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, view_name: &str) -> PathBuf {
        let safe_name = view_name.replace(['/', '\\', ':'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    /// The cached module for `view_name`, if its entry hash still matches.
    pub fn get(
        &self,
        view_name: &str,
        source: &str,
        resources: &WrapperResources,
    ) -> Option<CompiledModule> {
        let path = self.entry_path(view_name);
        let data = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                warn!(target: "blade_spa", view = view_name, error = %e, "dropping corrupt cache entry");
                fs::remove_file(&path).ok();
                return None;
            }
        };

        if entry.hash == Self::entry_hash(source, resources) {
            debug!(target: "blade_spa", view = view_name, "cache hit");
            Some(entry.module)
        } else {
            None
        }
    }

    pub fn set(
        &self,
        view_name: &str,
        source: &str,
        resources: &WrapperResources,
        module: &CompiledModule,
    ) -> Result<()> {
        let path = self.entry_path(view_name);
        let entry = CacheEntry {
            hash: Self::entry_hash(source, resources),
            module: module.clone(),
        };
        let data = serde_json::to_string(&entry)?;
        fs::write(&path, data).map_err(|e| CompileError::io(&path, e))
    }
}
