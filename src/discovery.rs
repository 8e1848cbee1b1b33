//! View discovery and batch compilation.
//!
//! The caller side of the compiler: find templates on disk, compile them in
//! parallel and write the resulting modules plus an index module.

use crate::cache::CompileCache;
use crate::validate::{CompileError, CompiledModule, Result};
use crate::Compiler;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const INDEX_FILE: &str = "index.js";

/// Recursively finds every file under `root` whose name ends with `pattern`.
/// Unreadable entries are skipped with a warning.
pub fn discover_views(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(CompileError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "views directory not found"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "blade_spa", error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(pattern))
            .unwrap_or(false);
        if path.is_file() && matches {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// `root/web/home.blade.php` becomes `web.home`.
pub fn view_name_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect();
    let file = relative.file_name()?.to_str()?;
    let stem = file.split('.').next().unwrap_or(file);
    if stem.is_empty() {
        return None;
    }
    parts.push(stem.to_string());
    Some(parts.join("."))
}

#[derive(Debug)]
pub struct CompileOutcome {
    pub path: PathBuf,
    pub view_name: String,
    pub cached: bool,
    pub result: std::result::Result<CompiledModule, CompileError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<CompileOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn modules(&self) -> impl Iterator<Item = &CompiledModule> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

fn compile_one(
    compiler: &Compiler,
    root: &Path,
    path: &Path,
    cache: Option<&CompileCache>,
) -> CompileOutcome {
    let view_name = view_name_for(root, path).unwrap_or_else(|| path.display().to_string());
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            return CompileOutcome {
                path: path.to_path_buf(),
                view_name,
                cached: false,
                result: Err(CompileError::io(path, e)),
            }
        }
    };

    if let Some(module) = cache.and_then(|c| c.get(&view_name, &source, compiler.resources())) {
        return CompileOutcome {
            path: path.to_path_buf(),
            view_name,
            cached: true,
            result: Ok(module),
        };
    }

    let module = compiler.compile_module(&source, &view_name);
    if let Some(cache) = cache {
        if let Err(e) = cache.set(&view_name, &source, compiler.resources(), &module) {
            warn!(target: "blade_spa", view = %view_name, error = %e, "failed to write cache entry");
        }
    }
    CompileOutcome {
        path: path.to_path_buf(),
        view_name,
        cached: false,
        result: Ok(module),
    }
}

/// Compiles `files` in parallel. A failing file is reported in its outcome
/// and never stops the rest of the batch.
pub fn compile_batch(
    compiler: &Compiler,
    root: &Path,
    files: &[PathBuf],
    cache: Option<&CompileCache>,
) -> BatchReport {
    let outcomes: Vec<CompileOutcome> = files
        .par_iter()
        .map(|path| compile_one(compiler, root, path, cache))
        .collect();

    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let failed = outcomes.len() - succeeded;
    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            warn!(target: "blade_spa", view = %outcome.view_name, error = %e, "compile failed");
        }
    }
    info!(target: "blade_spa", succeeded, failed, "batch compiled");
    BatchReport {
        outcomes,
        succeeded,
        failed,
    }
}

/// Relative module path for a view: `web.home` becomes `web/home.js`.
pub fn module_path(view_name: &str) -> PathBuf {
    let mut path: PathBuf = view_name.split('.').collect();
    path.set_extension("js");
    path
}

/// Writes one module per view and an index module importing all of them.
pub fn write_outputs(
    out_dir: &Path,
    modules: &[CompiledModule],
    auto_create_dirs: bool,
) -> Result<Vec<PathBuf>> {
    if auto_create_dirs {
        fs::create_dir_all(out_dir).map_err(|e| CompileError::io(out_dir, e))?;
    }

    let mut written = Vec::with_capacity(modules.len() + 1);
    let mut imports = Vec::new();
    let mut entries = Vec::new();
    for module in modules {
        let relative = module_path(&module.view_name);
        let target = out_dir.join(&relative);
        if let Some(parent) = target.parent() {
            if auto_create_dirs {
                fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
            }
        }
        fs::write(&target, &module.source).map_err(|e| CompileError::io(&target, e))?;
        written.push(target);

        let import_path = relative.to_string_lossy().replace('\\', "/");
        imports.push(format!(
            "import {{ {} }} from './{}';",
            module.function_name, import_path
        ));
        entries.push(format!(
            "    {}: {}",
            crate::js::quote_single(&module.view_name),
            module.function_name
        ));
    }

    let index = format!(
        "{}\n\nexport const views = {{\n{}\n}};\n",
        imports.join("\n"),
        entries.join(",\n")
    );
    let index_path = out_dir.join(INDEX_FILE);
    fs::write(&index_path, index).map_err(|e| CompileError::io(&index_path, e))?;
    written.push(index_path);
    Ok(written)
}
