//! Project-wide symbol index.
//!
//! Symbols are kept per file in one record shared by two maps, one keyed by
//! declaring module name and one by file path. Indexing a file always evicts
//! its previous record from both maps before inserting the new one, so a
//! module that was renamed never lingers under its old name.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use elm_syntax::parse_module;

use crate::config::Config;
use crate::project::{module_relative_path, normalize};
use crate::symbols::{Symbol, extract_symbols};
use crate::uri::path_to_uri;
use crate::vfs::FileSystem;

/// Symbols extracted from one file.
#[derive(Debug, PartialEq, Eq)]
pub struct ModuleSymbols {
    pub module_path: PathBuf,
    pub module_name: String,
    pub symbols: Vec<Symbol>,
}

/// A parsed workspace-symbol query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolQuery<'a> {
    /// `Module:name`: exact name within one module.
    Qualified { module: &'a str, name: &'a str },
    /// Anything else: loose match across the workspace.
    Bare(&'a str),
}

impl<'a> SymbolQuery<'a> {
    pub fn parse(query: &'a str) -> Self {
        match query.split_once(':') {
            Some((module, name)) if is_module_name(module) => {
                SymbolQuery::Qualified { module, name }
            }
            _ => SymbolQuery::Bare(query),
        }
    }
}

fn is_module_name(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            part.starts_with(|c: char| c.is_uppercase())
                && part.chars().all(|c| c.is_alphanumeric() || c == '_')
        })
}

pub struct WorkspaceSymbolIndex {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    max_files: usize,
    exclude: Option<String>,
    by_module: HashMap<String, Arc<ModuleSymbols>>,
    by_path: HashMap<PathBuf, Arc<ModuleSymbols>>,
    /// Modules with no single workspace file, until the workspace changes.
    missing: HashSet<String>,
    last_full_index: Option<SystemTime>,
}

impl WorkspaceSymbolIndex {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            fs,
            root: root.into(),
            max_files: config.max_workspace_files_used_by_symbols,
            exclude: config.exclude_pattern().map(str::to_owned),
            by_module: HashMap::new(),
            by_path: HashMap::new(),
            missing: HashSet::new(),
            last_full_index: None,
        }
    }

    /// Apply new scan settings. A change to them drops everything indexed so
    /// far, so the next bare query rescans under the new settings.
    pub fn reconfigure(&mut self, config: &Config) {
        let max_files = config.max_workspace_files_used_by_symbols;
        let exclude = config.exclude_pattern().map(str::to_owned);
        if max_files == self.max_files && exclude == self.exclude {
            return;
        }
        tracing::info!(max_files, ?exclude, "Scan settings changed, resetting index");
        self.max_files = max_files;
        self.exclude = exclude;
        self.by_module.clear();
        self.by_path.clear();
        self.missing.clear();
        self.last_full_index = None;
    }

    /// Answer a workspace-symbol query.
    ///
    /// `Module:name` returns the symbols of exactly that module whose name is
    /// exactly `name`, indexing the module on demand. Any other query scans
    /// the workspace once and returns every symbol whose name the query
    /// starts with.
    pub fn provide_workspace_symbols(&mut self, query: &str) -> Vec<Symbol> {
        let symbols: Vec<Symbol> = match SymbolQuery::parse(query) {
            SymbolQuery::Qualified { module, name } => {
                if !self.by_module.contains_key(module) && !self.missing.contains(module) {
                    self.index_module(module);
                }
                self.by_module
                    .get(module)
                    .map(|record| {
                        record
                            .symbols
                            .iter()
                            .filter(|symbol| symbol.name == name)
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default()
            }
            SymbolQuery::Bare(query) => {
                if self.last_full_index.is_none() {
                    self.full_scan();
                }
                self.by_path
                    .values()
                    .flat_map(|record| record.symbols.iter())
                    .filter(|symbol| query.starts_with(symbol.name.as_str()))
                    .cloned()
                    .collect()
            }
        };
        tracing::debug!(query, results = symbols.len(), "Workspace symbols");
        symbols
    }

    /// Re-derive the symbols of one file from `text` and splice them in.
    ///
    /// Text that does not parse leaves the file with no symbols.
    pub fn update(&mut self, path: &Path, text: &str) {
        let path = normalize(path);
        self.remove(&path);

        let module = match parse_module(text) {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Not indexing unparsable module");
                return;
            }
        };
        let uri = match path_to_uri(&path) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Not indexing module");
                return;
            }
        };

        let record = Arc::new(ModuleSymbols {
            module_path: path.clone(),
            module_name: module.name.clone(),
            symbols: extract_symbols(&module, &uri),
        });
        tracing::debug!(
            path = %path.display(),
            module = %record.module_name,
            symbols = record.symbols.len(),
            "Indexed module"
        );
        self.by_module
            .insert(record.module_name.clone(), record.clone());
        self.by_path.insert(path, record);
    }

    /// Read and index the file at `path`. Returns whether it was readable.
    pub fn index_path(&mut self, path: &Path) -> bool {
        match self.fs.read_file(path) {
            Ok(text) => {
                self.update(path, &text);
                true
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot index file");
                false
            }
        }
    }

    /// Find the one workspace file for `module_name` and index it.
    ///
    /// Zero or several matching files both count as not found.
    pub fn index_module(&mut self, module_name: &str) -> bool {
        let relative = module_relative_path(module_name);
        let pattern = format!("**/{}", relative.to_string_lossy().replace('\\', "/"));
        let matches = match self
            .fs
            .find_files(&self.root, &pattern, self.exclude.as_deref(), 2)
        {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(module = module_name, error = %e, "Module search failed");
                return false;
            }
        };
        let indexed = match matches.as_slice() {
            [path] => self.index_path(path),
            [] => {
                tracing::debug!(module = module_name, "No file for module");
                false
            }
            _ => {
                tracing::debug!(module = module_name, ?matches, "Ambiguous module file");
                false
            }
        };
        if !indexed {
            self.missing.insert(module_name.to_owned());
        }
        indexed
    }

    /// Index every module file in the workspace.
    ///
    /// Best effort: a file that is not UTF-8 contributes no symbols, any other
    /// error stops the scan and whatever was indexed so far is kept. The scan
    /// counts as done either way.
    pub fn full_scan(&mut self) {
        self.last_full_index = Some(SystemTime::now());
        let files = match self.fs.find_files(
            &self.root,
            "**/*.elm",
            self.exclude.as_deref(),
            self.max_files,
        ) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "Workspace scan aborted");
                return;
            }
        };
        tracing::info!(root = %self.root.display(), files = files.len(), "Scanning workspace");
        for path in &files {
            match self.fs.read_file(path) {
                Ok(text) => self.update(path, &text),
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping undecodable file");
                    self.remove(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Workspace scan aborted");
                    return;
                }
            }
        }
    }

    /// Forget earlier failures to find module files.
    pub fn clear_missing(&mut self) {
        self.missing.clear();
    }

    /// Forget a file, e.g. after it was deleted.
    pub fn remove(&mut self, path: &Path) -> Option<Arc<ModuleSymbols>> {
        self.missing.clear();
        let old = self.by_path.remove(&normalize(path))?;
        // Another file may have claimed the module name since.
        if self
            .by_module
            .get(&old.module_name)
            .is_some_and(|current| Arc::ptr_eq(current, &old))
        {
            self.by_module.remove(&old.module_name);
        }
        Some(old)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(&normalize(path))
    }

    pub fn module(&self, module_name: &str) -> Option<&Arc<ModuleSymbols>> {
        self.by_module.get(module_name)
    }

    pub fn last_full_index(&self) -> Option<SystemTime> {
        self.last_full_index
    }
}
