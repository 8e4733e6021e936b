//! One workspace's editor session.
//!
//! Owns the document overlay, the module resolver and the symbol index, and
//! keeps them consistent as documents are opened, edited and saved.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_types::{FileChangeType, FileEvent, TextDocumentContentChangeEvent, Uri};

use crate::config::Config;
use crate::definition::provide_definition;
use crate::resolver::ModuleResolver;
use crate::symbols::{Symbol, document_symbols};
use crate::uri::uri_to_path;
use crate::vfs::{FileSystem, Vfs};
use crate::workspace_index::WorkspaceSymbolIndex;

pub struct Session {
    vfs: Arc<Vfs>,
    resolver: ModuleResolver,
    index: WorkspaceSymbolIndex,
    config: Config,
}

impl Session {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        let vfs = Arc::new(Vfs::new());
        let fs: Arc<dyn FileSystem> = vfs.clone();
        Self {
            resolver: ModuleResolver::new(fs.clone(), root.clone(), config.clone()),
            index: WorkspaceSymbolIndex::new(fs, root, &config),
            vfs,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    pub fn index(&self) -> &WorkspaceSymbolIndex {
        &self.index
    }

    pub fn open_document(&self, uri: &Uri, text: &str) {
        let Some(path) = uri_to_path(uri) else {
            tracing::debug!(uri = uri.as_str(), "Ignoring non-file document");
            return;
        };
        tracing::info!(path = %path.display(), "Document opened");
        self.resolver.invalidate_path(&path);
        self.vfs.open(path, text);
    }

    pub fn change_document(&self, uri: &Uri, changes: Vec<TextDocumentContentChangeEvent>) {
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        for change in changes {
            if !self.vfs.apply_change(&path, change) {
                tracing::warn!(path = %path.display(), "Dropped change to document");
                break;
            }
        }
        self.resolver.invalidate_path(&path);
    }

    pub fn close_document(&self, uri: &Uri) {
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        tracing::info!(path = %path.display(), "Document closed");
        self.vfs.close(&path);
        self.resolver.invalidate_path(&path);
    }

    /// Re-index a saved document.
    pub fn save_document(&mut self, uri: &Uri, text: Option<&str>) {
        let Some(path) = uri_to_path(uri) else {
            return;
        };
        tracing::info!(path = %path.display(), "Document saved");
        self.resolver.invalidate_path(&path);
        match text {
            Some(text) => self.index.update(&path, text),
            None => {
                self.index.index_path(&path);
            }
        }
    }

    pub fn document_symbols(&self, uri: &Uri) -> Vec<Symbol> {
        let Some(text) = self.document_text(uri) else {
            return Vec::new();
        };
        document_symbols(uri, &text)
    }

    pub fn workspace_symbols(&mut self, query: &str) -> Vec<Symbol> {
        self.index.provide_workspace_symbols(query)
    }

    pub fn definition(&mut self, uri: &Uri, position: lsp_types::Position) -> Option<Symbol> {
        let path = uri_to_path(uri)?;
        let text = self.document_text(uri)?;
        provide_definition(&self.resolver, &mut self.index, &path, &text, position)
    }

    pub fn reconfigure(&mut self, config: Config) {
        tracing::info!(?config, "Configuration changed");
        self.index.reconfigure(&config);
        self.resolver.reconfigure(config.clone());
        self.config = config;
    }

    /// React to files created, changed or deleted outside the editor.
    pub fn files_changed(&mut self, events: Vec<FileEvent>) {
        self.index.clear_missing();
        for event in events {
            let Some(path) = uri_to_path(&event.uri) else {
                continue;
            };
            self.resolver.invalidate_path(&path);
            if event.typ == FileChangeType::DELETED {
                tracing::info!(path = %path.display(), "File deleted");
                self.index.remove(&path);
            } else if self.index.contains_path(&path) || self.index.last_full_index().is_some() {
                if self.vfs.is_open(&path) {
                    // The editor's copy wins until it is saved.
                    continue;
                }
                self.index.index_path(&path);
            }
        }
    }

    fn document_text(&self, uri: &Uri) -> Option<String> {
        let path = uri_to_path(uri)?;
        match self.vfs.read_file(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Document not readable");
                None
            }
        }
    }
}
