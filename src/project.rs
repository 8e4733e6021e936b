//! Project manifest discovery.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::config::Config;
use crate::error::WorkspaceResult;
use crate::vfs::FileSystem;

/// Source directories declared by the project manifest.
///
/// Manifests are tried in the configured order and the first usable one
/// wins. Without one, the workspace root is the only source directory.
pub fn discover_source_dirs(fs: &dyn FileSystem, root: &Path, config: &Config) -> Vec<PathBuf> {
    for manifest in &config.manifest_files {
        let path = root.join(manifest);
        let text = match fs.read_file(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Manifest not readable");
                continue;
            }
        };
        match source_dirs_from_manifest(&text, &config.source_directories_field) {
            Ok(Some(dirs)) => {
                let dirs: Vec<PathBuf> = dirs.iter().map(|dir| normalize(&root.join(dir))).collect();
                tracing::info!(manifest = %path.display(), ?dirs, "Source directories");
                return dirs;
            }
            Ok(None) => {
                tracing::warn!(manifest = %path.display(), "Manifest declares no source directories");
            }
            Err(e) => {
                tracing::warn!(manifest = %path.display(), error = %e, "Malformed manifest");
            }
        }
    }
    tracing::info!(root = %root.display(), "No usable manifest, using workspace root");
    vec![root.to_path_buf()]
}

fn source_dirs_from_manifest(text: &str, field: &str) -> WorkspaceResult<Option<Vec<String>>> {
    let manifest: Value = serde_json::from_str(text)?;
    if let Some(Value::Array(entries)) = manifest.get(field) {
        let dirs: Option<Vec<String>> = entries
            .iter()
            .map(|entry| entry.as_str().map(str::to_owned))
            .collect();
        return Ok(dirs);
    }
    // Packages keep their modules in `src` without declaring it.
    if manifest.get("type").and_then(Value::as_str) == Some("package") {
        return Ok(Some(vec!["src".to_owned()]));
    }
    Ok(None)
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component)
            }
        }
    }
    out
}

/// Path of `module_name` relative to a source directory: `A.B` → `A/B.elm`.
pub fn module_relative_path(module_name: &str) -> PathBuf {
    let mut path: PathBuf = module_name.split('.').collect();
    path.set_extension("elm");
    path
}
