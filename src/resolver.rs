//! Module resolution with a parse cache.
//!
//! Maps a file path or a dotted module name to its [`ParsedModule`]. Parsed
//! modules are cached by path until invalidated. Every failure (missing
//! file, parse error, missing manifest) is logged and reported as `None`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use elm_syntax::{ParsedModule, parse_module};

use crate::config::Config;
use crate::project::{discover_source_dirs, module_relative_path, normalize};
use crate::vfs::FileSystem;

/// A cached parse of one file.
#[derive(Clone, Debug)]
pub struct ModuleCacheEntry {
    pub module_path: PathBuf,
    pub module_name: String,
    pub parsed: Arc<ParsedModule>,
}

pub struct ModuleResolver {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    config: Config,
    source_dirs: OnceLock<Vec<PathBuf>>,
    cache: DashMap<PathBuf, ModuleCacheEntry>,
}

impl ModuleResolver {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            fs,
            root: root.into(),
            config,
            source_dirs: OnceLock::new(),
            cache: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed content of the file at `path`, from the cache when possible.
    pub fn module_from_path(&self, path: &Path) -> Option<Arc<ParsedModule>> {
        let path = normalize(path);
        match self.cache.entry(path) {
            Entry::Occupied(entry) => {
                tracing::debug!(path = %entry.key().display(), "Module cache hit");
                Some(entry.get().parsed.clone())
            }
            Entry::Vacant(entry) => {
                let path = entry.key();
                let text = match self.fs.read_file(path) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "Module not readable");
                        return None;
                    }
                };
                let parsed = match parse_module(&text) {
                    Ok(parsed) => Arc::new(parsed),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Module failed to parse");
                        return None;
                    }
                };
                tracing::debug!(path = %path.display(), module = %parsed.name, "Module cached");
                let cached = ModuleCacheEntry {
                    module_path: path.clone(),
                    module_name: parsed.name.clone(),
                    parsed: parsed.clone(),
                };
                entry.insert(cached);
                Some(parsed)
            }
        }
    }

    /// Parsed content of the module called `name`, searched for in each
    /// source directory in declaration order.
    pub fn module_from_name(&self, name: &str) -> Option<Arc<ParsedModule>> {
        let found = self
            .candidate_paths(name)
            .into_iter()
            .find_map(|path| self.module_from_path(&path));
        if found.is_none() {
            tracing::debug!(module = name, "Module not found in source directories");
        }
        found
    }

    pub fn invalidate_path(&self, path: &Path) {
        if self.cache.remove(&normalize(path)).is_some() {
            tracing::debug!(path = %path.display(), "Module cache entry invalidated");
        }
    }

    /// Drop every cached parse that could answer `module_from_name(name)`.
    pub fn invalidate_module(&self, name: &str) {
        for path in self.candidate_paths(name) {
            self.invalidate_path(&path);
        }
        self.cache.retain(|_, entry| entry.module_name != name);
    }

    /// Source directories, discovered on first use.
    pub fn source_dirs(&self) -> &[PathBuf] {
        self.source_dirs
            .get_or_init(|| discover_source_dirs(self.fs.as_ref(), &self.root, &self.config))
    }

    /// Apply new settings. Source directories are rediscovered on next use.
    pub fn reconfigure(&mut self, config: Config) {
        self.config = config;
        self.source_dirs = OnceLock::new();
    }

    fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let relative = module_relative_path(name);
        self.source_dirs()
            .iter()
            .map(|dir| dir.join(&relative))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkspaceResult;
    use crate::vfs::Vfs;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts reads that reach the underlying filesystem.
    struct CountingFs {
        inner: Vfs,
        reads: AtomicUsize,
    }

    impl CountingFs {
        fn new() -> Self {
            Self {
                inner: Vfs::new(),
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl FileSystem for CountingFs {
        fn read_file(&self, path: &Path) -> io::Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read_file(path)
        }

        fn find_files(
            &self,
            root: &Path,
            include: &str,
            exclude: Option<&str>,
            max_results: usize,
        ) -> WorkspaceResult<Vec<PathBuf>> {
            self.inner.find_files(root, include, exclude, max_results)
        }
    }

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_module_from_path_caches() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "A.elm", "module A exposing (..)\n\nfoo = 1\n");
        let fs = Arc::new(CountingFs::new());
        let resolver = ModuleResolver::new(fs.clone(), dir.path(), Config::default());

        let first = resolver.module_from_path(&path).unwrap();
        let second = resolver.module_from_path(&path).unwrap();
        assert_eq!(first.name, "A");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.reads(), 1);
    }

    #[test]
    fn test_invalidate_path_forces_reparse() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "A.elm", "module A exposing (..)\n\nfoo = 1\n");
        let fs = Arc::new(CountingFs::new());
        let resolver = ModuleResolver::new(fs.clone(), dir.path(), Config::default());
        resolver.module_from_path(&path).unwrap();

        write(&dir, "A.elm", "module A exposing (..)\n\nbar = 1\n");
        assert_eq!(resolver.module_from_path(&path).unwrap().functions[0].name, "foo");

        resolver.invalidate_path(&path);
        let reparsed = resolver.module_from_path(&path).unwrap();
        assert_eq!(reparsed.functions[0].name, "bar");
        assert_eq!(fs.reads(), 2);
    }

    #[test]
    fn test_invalidate_absent_path_is_noop() {
        let dir = TempDir::new().unwrap();
        let resolver = ModuleResolver::new(Arc::new(Vfs::new()), dir.path(), Config::default());
        resolver.invalidate_path(&dir.path().join("Nope.elm"));
        resolver.invalidate_module("Nope");
    }

    #[test]
    fn test_module_from_name_source_dir_order() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "elm.json",
            r#"{"type": "application", "source-directories": ["src", "vendor"]}"#,
        );
        write(&dir, "vendor/Foo/Bar.elm", "module Foo.Bar exposing (..)\n\nv = 1\n");
        let resolver = ModuleResolver::new(Arc::new(Vfs::new()), dir.path(), Config::default());
        assert_eq!(resolver.module_from_name("Foo.Bar").unwrap().functions[0].name, "v");

        write(&dir, "src/Foo/Bar.elm", "module Foo.Bar exposing (..)\n\ns = 1\n");
        resolver.invalidate_module("Foo.Bar");
        assert_eq!(resolver.module_from_name("Foo.Bar").unwrap().functions[0].name, "s");
    }

    #[test]
    fn test_module_from_name_without_manifest() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Foo/Bar.elm", "module Foo.Bar exposing (..)\n\nx = 1\n");
        let resolver = ModuleResolver::new(Arc::new(Vfs::new()), dir.path(), Config::default());
        assert_eq!(resolver.source_dirs(), [dir.path().to_path_buf()]);
        assert_eq!(resolver.module_from_name("Foo.Bar").unwrap().name, "Foo.Bar");
        assert!(resolver.module_from_name("Foo.Baz").is_none());
    }

    #[test]
    fn test_unparsable_module_is_none_and_uncached() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "Bad.elm", "this is not elm\n");
        let resolver = ModuleResolver::new(Arc::new(Vfs::new()), dir.path(), Config::default());
        assert!(resolver.module_from_path(&path).is_none());
        assert!(resolver.cache.is_empty());
    }

    #[test]
    fn test_reconfigure_rediscovers_source_dirs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "elm.json", r#"{"source-directories": ["src"]}"#);
        write(&dir, "project.json", r#"{"dirs": ["lib"]}"#);
        let mut resolver =
            ModuleResolver::new(Arc::new(Vfs::new()), dir.path(), Config::default());
        assert_eq!(resolver.source_dirs(), [dir.path().join("src")]);

        resolver.reconfigure(Config {
            manifest_files: vec!["project.json".to_owned()],
            source_directories_field: "dirs".to_owned(),
            ..Config::default()
        });
        assert_eq!(resolver.source_dirs(), [dir.path().join("lib")]);
    }
}
