//! Common test utilities: on-disk Elm workspaces.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use elm_ls::uri::path_to_uri;
use elm_ls::{Config, ModuleResolver, Session, Vfs, WorkspaceSymbolIndex};
use lsp_types::Uri;
use tempfile::TempDir;

pub const ELM_JSON: &str = r#"{
    "type": "application",
    "source-directories": ["src"],
    "elm-version": "0.19.1"
}"#;

/// A temporary workspace populated file by file.
pub struct Workspace {
    dir: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// An application workspace whose modules live under `src/`.
    pub fn application() -> Self {
        Self::new().file("elm.json", ELM_JSON)
    }

    pub fn file(self, name: &str, text: &str) -> Self {
        self.write(name, text);
        self
    }

    pub fn write(&self, name: &str, text: &str) {
        let path = self.path(name);
        std::fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("Failed to create directories");
        std::fs::write(&path, text).expect("Failed to write file");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn uri(&self, name: &str) -> Uri {
        path_to_uri(&self.path(name)).expect("valid file URI")
    }

    pub fn session(&self) -> Session {
        Session::new(self.root(), Config::default())
    }

    pub fn resolver(&self) -> ModuleResolver {
        ModuleResolver::new(Arc::new(Vfs::new()), self.root(), Config::default())
    }

    pub fn index(&self) -> WorkspaceSymbolIndex {
        WorkspaceSymbolIndex::new(Arc::new(Vfs::new()), self.root(), &Config::default())
    }
}

/// Position of the first occurrence of `needle` on a line, plus `skip`
/// characters, as an LSP position.
#[allow(dead_code)]
pub fn position_of(text: &str, needle: &str, skip: u32) -> lsp_types::Position {
    for (line, content) in text.lines().enumerate() {
        if let Some(column) = content.find(needle) {
            return lsp_types::Position::new(line as u32, column as u32 + skip);
        }
    }
    panic!("{needle:?} not found");
}
