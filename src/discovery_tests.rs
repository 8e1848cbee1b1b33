#[cfg(test)]
mod tests {
    use crate::discovery::*;
    use crate::{CompileCache, CompileError, Compiler, CompilerConfig, WrapperResources};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn views_fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "web/home.blade.php", "<h1>Home</h1>");
        write(dir.path(), "web/partials/nav.blade.php", "@vars($items)\n<nav>{{ $items }}</nav>");
        write(dir.path(), "README.md", "# not a view");
        dir
    }

    fn compiler() -> Compiler {
        Compiler::new(WrapperResources::default())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DISCOVERY
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_discover_views() {
        let dir = views_fixture();
        let files = discover_views(dir.path(), ".blade.php").unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("web/home.blade.php"),
                dir.path().join("web/partials/nav.blade.php"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_views(&dir.path().join("nope"), ".blade.php");
        assert!(matches!(result, Err(CompileError::Io { .. })));
    }

    #[test]
    fn test_view_names_and_module_paths() {
        let root = Path::new("/views");
        assert_eq!(
            view_name_for(root, Path::new("/views/web/home.blade.php")).as_deref(),
            Some("web.home")
        );
        assert_eq!(
            view_name_for(root, Path::new("/views/web/partials/nav.blade.php")).as_deref(),
            Some("web.partials.nav")
        );
        assert_eq!(view_name_for(root, Path::new("/elsewhere/a.blade.php")), None);
        assert_eq!(module_path("web.home"), PathBuf::from("web/home.js"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // BATCH AND OUTPUT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_batch_compiles_and_writes_index() {
        let dir = views_fixture();
        let out = tempfile::tempdir().unwrap();
        let files = discover_views(dir.path(), ".blade.php").unwrap();

        let report = compile_batch(&compiler(), dir.path(), &files, None);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);

        let modules: Vec<_> = report.modules().cloned().collect();
        let written = write_outputs(out.path(), &modules, true).unwrap();
        assert_eq!(written.len(), 3);
        assert!(out.path().join("web/home.js").is_file());
        assert!(out.path().join("web/partials/nav.js").is_file());

        let home = fs::read_to_string(out.path().join("web/home.js")).unwrap();
        assert!(home.contains("export function WebHome("));

        let index = fs::read_to_string(out.path().join(INDEX_FILE)).unwrap();
        assert!(index.contains("import { WebHome } from './web/home.js';"));
        assert!(index.contains("import { WebPartialsNav } from './web/partials/nav.js';"));
        assert!(index.contains("    'web.home': WebHome,\n"));
        assert!(index.contains("export const views = {"));
    }

    #[test]
    fn test_failing_file_does_not_stop_batch() {
        let dir = views_fixture();
        let mut files = discover_views(dir.path(), ".blade.php").unwrap();
        files.push(dir.path().join("web/missing.blade.php"));

        let report = compile_batch(&compiler(), dir.path(), &files, None);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        let failed = report.outcomes.iter().find(|o| o.result.is_err()).unwrap();
        assert_eq!(failed.view_name, "web.missing");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CACHE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_cache_hits_on_unchanged_source() {
        let dir = views_fixture();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = CompileCache::new(cache_dir.path().join("cache")).unwrap();
        let files = discover_views(dir.path(), ".blade.php").unwrap();

        let first = compile_batch(&compiler(), dir.path(), &files, Some(&cache));
        assert!(first.outcomes.iter().all(|o| !o.cached));

        let second = compile_batch(&compiler(), dir.path(), &files, Some(&cache));
        assert!(second.outcomes.iter().all(|o| o.cached));
        assert_eq!(
            first.modules().cloned().collect::<Vec<_>>(),
            second.modules().cloned().collect::<Vec<_>>()
        );

        write(dir.path(), "web/home.blade.php", "<h1>Changed</h1>");
        let third = compile_batch(&compiler(), dir.path(), &files, Some(&cache));
        let home = third.outcomes.iter().find(|o| o.view_name == "web.home").unwrap();
        assert!(!home.cached);
    }

    #[test]
    fn test_cache_misses_when_resources_change() {
        let dir = views_fixture();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = CompileCache::new(cache_dir.path()).unwrap();
        let files = discover_views(dir.path(), ".blade.php").unwrap();

        compile_batch(&compiler(), dir.path(), &files, Some(&cache));
        let same = compile_batch(&compiler(), dir.path(), &files, Some(&cache));
        assert!(same.outcomes.iter().all(|o| o.cached));

        let resources = WrapperResources::parse(
            "// start wrapper\nconst self = new View();\n// end wrapper\n",
        );
        let changed = Compiler::new(resources.clone());
        let report = compile_batch(&changed, dir.path(), &files, Some(&cache));
        assert!(report.outcomes.iter().all(|o| !o.cached));

        let source = "<h1>Home</h1>";
        assert_ne!(
            CompileCache::entry_hash(source, &WrapperResources::default()),
            CompileCache::entry_hash(source, &resources)
        );
        assert_ne!(
            CompileCache::entry_hash(source, &WrapperResources::default()),
            CompileCache::compute_hash(source)
        );
    }

    #[test]
    fn test_corrupt_cache_entry_dropped() {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = CompileCache::new(cache_dir.path()).unwrap();
        let entry = cache.dir().join("web.home.json");
        fs::write(&entry, "not json").unwrap();

        assert!(cache
            .get("web.home", "<h1>x</h1>", &WrapperResources::default())
            .is_none());
        assert!(!entry.exists());
    }

    #[test]
    fn test_compute_hash() {
        assert_eq!(
            CompileCache::compute_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CONFIG
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_config_defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let missing = CompilerConfig::load(dir.path().join("blade-spa.config.json")).unwrap();
        assert_eq!(missing, CompilerConfig::default());

        let path = write(dir.path(), "blade-spa.config.json", r#"{"viewsInput": "views", "verbose": true}"#);
        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(config.views_input, PathBuf::from("views"));
        assert!(config.verbose);
        assert_eq!(config.blade_pattern, ".blade.php");
        assert!(config.auto_create_dirs);
    }

    #[test]
    fn test_config_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "blade-spa.config.json", "{ not json");
        assert!(matches!(
            CompilerConfig::load(&path),
            Err(CompileError::Config { .. })
        ));
    }

    #[test]
    fn test_config_rooted() {
        let config = CompilerConfig {
            output_dir: PathBuf::from("/abs/out"),
            ..CompilerConfig::default()
        }
        .rooted(Path::new("/project"));
        assert_eq!(config.views_input, PathBuf::from("/project/resources/views"));
        assert_eq!(config.output_dir, PathBuf::from("/abs/out"));
    }
}
