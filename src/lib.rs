//! Workspace symbols and go-to-definition for Elm projects.
//!
//! The pieces fit together bottom-up: a [`vfs::FileSystem`] supplies module
//! text, the [`resolver::ModuleResolver`] parses and caches modules by path
//! and by name, [`symbols`] flattens a parsed module into located symbols,
//! the [`workspace_index::WorkspaceSymbolIndex`] aggregates those across the
//! project, and [`definition`] answers "where is this defined" on top of all
//! of them. A [`session::Session`] owns one instance of each per workspace.

pub mod config;
pub mod definition;
pub mod error;
pub mod project;
pub mod resolver;
pub mod session;
pub mod symbols;
pub mod uri;
pub mod vfs;
pub mod workspace_index;

pub use config::Config;
pub use error::{WorkspaceError, WorkspaceResult};
pub use resolver::ModuleResolver;
pub use session::Session;
pub use symbols::{Symbol, SymbolKind};
pub use vfs::{FileSystem, Vfs};
pub use workspace_index::WorkspaceSymbolIndex;
