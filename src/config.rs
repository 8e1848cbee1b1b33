//! Build configuration (`blade-spa.config.json`).

use crate::validate::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "blade-spa.config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    pub views_input: PathBuf,
    pub js_input: PathBuf,
    pub output_dir: PathBuf,
    pub wrapper_file: PathBuf,
    /// File suffix identifying templates.
    pub blade_pattern: String,
    pub default_scope: String,
    pub auto_create_dirs: bool,
    pub verbose: bool,
    pub cache_dir: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            views_input: PathBuf::from("resources/views"),
            js_input: PathBuf::from("resources/js/app"),
            output_dir: PathBuf::from("resources/js/views"),
            wrapper_file: PathBuf::from(crate::wrapper::DEFAULT_WRAPPER_FILE),
            blade_pattern: ".blade.php".to_string(),
            default_scope: "web".to_string(),
            auto_create_dirs: true,
            verbose: false,
            cache_dir: PathBuf::from(".blade-spa/cache"),
        }
    }
}

impl CompilerConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(target: "blade_spa", path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| CompileError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolves every relative path against `root`.
    pub fn rooted(mut self, root: &Path) -> Self {
        for path in [
            &mut self.views_input,
            &mut self.js_input,
            &mut self.output_dir,
            &mut self.wrapper_file,
            &mut self.cache_dir,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }
}
