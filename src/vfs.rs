//! File access for the resolver and the index.
//!
//! [`Vfs`] layers the documents open in the editor over the disk, so unsaved
//! edits are what gets parsed.

use std::io;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use globset::{GlobBuilder, GlobMatcher};
use lsp_types::{Range, TextDocumentContentChangeEvent};
use ropey::Rope;
use walkdir::WalkDir;

use crate::error::WorkspaceResult;

/// The workspace operations the core depends on.
pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Files under `root` whose root-relative path matches `include` and not
    /// `exclude`, in a stable order, at most `max_results` of them.
    fn find_files(
        &self,
        root: &Path,
        include: &str,
        exclude: Option<&str>,
        max_results: usize,
    ) -> WorkspaceResult<Vec<PathBuf>>;
}

/// Open editor documents over the real filesystem.
#[derive(Default)]
pub struct Vfs {
    documents: DashMap<PathBuf, Rope>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, path: PathBuf, text: &str) {
        self.documents.insert(path, Rope::from_str(text));
    }

    pub fn close(&self, path: &Path) -> bool {
        self.documents.remove(path).is_some()
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    /// Current text of an open document.
    pub fn text(&self, path: &Path) -> Option<String> {
        self.documents.get(path).map(|rope| rope.to_string())
    }

    /// Apply one LSP content change. Returns `false` if the document is not
    /// open or the range lies outside it.
    pub fn apply_change(&self, path: &Path, change: TextDocumentContentChangeEvent) -> bool {
        let Entry::Occupied(mut entry) = self.documents.entry(path.to_path_buf()) else {
            return false;
        };
        match change.range {
            Some(range) => {
                let rope = entry.get_mut();
                let Some((start_char, end_char)) = char_range(rope, range) else {
                    tracing::warn!(path = %path.display(), ?range, "Change outside document");
                    return false;
                };
                rope.remove(start_char..end_char);
                rope.insert(start_char, &change.text);
            }
            None => {
                entry.insert(Rope::from_str(&change.text));
            }
        }
        true
    }
}

impl FileSystem for Vfs {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        if let Some(rope) = self.documents.get(path) {
            return Ok(rope.to_string());
        }
        std::fs::read_to_string(path)
    }

    fn find_files(
        &self,
        root: &Path,
        include: &str,
        exclude: Option<&str>,
        max_results: usize,
    ) -> WorkspaceResult<Vec<PathBuf>> {
        let include = compile_glob(include)?;
        let exclude = exclude.map(compile_glob).transpose()?;

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let Some(exclude) = &exclude else {
                    return true;
                };
                !entry.file_type().is_dir()
                    || entry
                        .path()
                        .strip_prefix(root)
                        .map_or(true, |relative| !excludes_dir(exclude, relative))
            });

        let mut found = Vec::new();
        for entry in walker {
            if found.len() >= max_results {
                break;
            }
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if exclude.as_ref().is_some_and(|glob| glob.is_match(relative)) {
                continue;
            }
            if include.is_match(relative) {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }
}

/// Whether everything below the directory `relative` is excluded.
fn excludes_dir(exclude: &GlobMatcher, relative: &Path) -> bool {
    !relative.as_os_str().is_empty() && exclude.is_match(relative.join("_"))
}

fn compile_glob(pattern: &str) -> WorkspaceResult<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

fn char_range(rope: &Rope, range: Range) -> Option<(usize, usize)> {
    let start = offset_from_position(rope, range.start.line, range.start.character)?;
    let end = offset_from_position(rope, range.end.line, range.end.character)?;
    if start > end {
        return None;
    }
    Some((rope.byte_to_char(start), rope.byte_to_char(end)))
}

/// Byte offset of an LSP (line, UTF-16 character) position.
fn offset_from_position(rope: &Rope, line: u32, character: u32) -> Option<usize> {
    let line = line as usize;
    if line >= rope.len_lines() {
        return None;
    }
    let line_start_char = rope.line_to_char(line);
    let line_slice = rope.line(line);
    let mut end = line_slice.len_chars();
    if end > 0 && line_slice.char(end - 1) == '\n' {
        end -= 1;
    }
    let slice = line_slice.slice(..end);
    let utf16_offset = (character as usize).min(slice.len_utf16_cu());
    let char_offset = slice.utf16_cu_to_char(utf16_offset);
    Some(rope.char_to_byte(line_start_char + char_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;
    use tempfile::TempDir;

    fn change(range: Option<((u32, u32), (u32, u32))>, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: range.map(|(start, end)| Range {
                start: Position::new(start.0, start.1),
                end: Position::new(end.0, end.1),
            }),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_offset_from_position_utf16() {
        let rope = Rope::from_str("a\u{1F600}b\nxy");
        assert_eq!(offset_from_position(&rope, 0, 3), Some(5));
        assert_eq!(offset_from_position(&rope, 0, 99), Some(6));
        assert_eq!(offset_from_position(&rope, 1, 1), Some(8));
        assert_eq!(offset_from_position(&rope, 5, 0), None);
    }

    #[test]
    fn test_incremental_change() {
        let vfs = Vfs::new();
        let path = PathBuf::from("/w/A.elm");
        vfs.open(path.clone(), "foo = 1\nbar = 2\n");

        assert!(vfs.apply_change(&path, change(Some(((1, 0), (1, 3))), "baz")));
        assert_eq!(vfs.text(&path).as_deref(), Some("foo = 1\nbaz = 2\n"));

        assert!(vfs.apply_change(&path, change(None, "x = 3")));
        assert_eq!(vfs.text(&path).as_deref(), Some("x = 3"));
    }

    #[test]
    fn test_change_to_unopened_document() {
        let vfs = Vfs::new();
        assert!(!vfs.apply_change(Path::new("/w/B.elm"), change(None, "x")));
    }

    #[test]
    fn test_overlay_shadows_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.elm");
        std::fs::write(&path, "on disk").unwrap();

        let vfs = Vfs::new();
        assert_eq!(vfs.read_file(&path).unwrap(), "on disk");
        vfs.open(path.clone(), "in editor");
        assert_eq!(vfs.read_file(&path).unwrap(), "in editor");
        assert!(vfs.close(&path));
        assert_eq!(vfs.read_file(&path).unwrap(), "on disk");
    }

    #[test]
    fn test_find_files_respects_exclude_and_limit() {
        let dir = TempDir::new().unwrap();
        for file in [
            "src/A.elm",
            "src/B.elm",
            "src/Nested/C.elm",
            "src/notes.txt",
            "elm-stuff/0.19.1/D.elm",
            "node_modules/pkg/E.elm",
        ] {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "").unwrap();
        }

        let vfs = Vfs::new();
        let found = vfs
            .find_files(
                dir.path(),
                "**/*.elm",
                Some("**/{node_modules,elm-stuff}/**"),
                100,
            )
            .unwrap();
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("src/A.elm"),
                PathBuf::from("src/B.elm"),
                PathBuf::from("src/Nested/C.elm"),
            ]
        );

        let limited = vfs.find_files(dir.path(), "**/*.elm", None, 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let exclude = compile_glob("**/{node_modules,elm-stuff}/**").unwrap();
        assert!(excludes_dir(&exclude, Path::new("node_modules")));
        assert!(excludes_dir(&exclude, Path::new("app/elm-stuff")));
        assert!(excludes_dir(&exclude, Path::new("node_modules/pkg")));
        assert!(!excludes_dir(&exclude, Path::new("src")));
        assert!(!excludes_dir(&exclude, Path::new("")));

        let generated = compile_glob("gen/**").unwrap();
        assert!(excludes_dir(&generated, Path::new("gen")));
        assert!(!excludes_dir(&generated, Path::new("src/gen")));
    }

    #[test]
    fn test_find_files_module_pattern() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("src/Nested/C.elm");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();

        let vfs = Vfs::new();
        let found = vfs
            .find_files(dir.path(), "**/Nested/C.elm", None, 2)
            .unwrap();
        assert_eq!(found, vec![path]);
    }

    #[test]
    fn test_find_files_invalid_glob() {
        let dir = TempDir::new().unwrap();
        let vfs = Vfs::new();
        assert!(vfs.find_files(dir.path(), "src/[", None, 10).is_err());
    }
}
