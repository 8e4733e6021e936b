//! Go-to-definition.
//!
//! A reference is resolved in layers, each less precise than the last:
//!
//! 1. imports that name the module explicitly (by alias or full name) or
//!    that list the symbol in their exposing list,
//! 2. the current module itself, when no import matched,
//! 3. every `exposing (..)` import, in declaration order, for unqualified
//!    names that the first two layers did not find.
//!
//! A later layer never shadows a hit from an earlier one.

use std::path::Path;

use elm_syntax::{ImportDeclaration, LineIndex, mask_comments};

use crate::resolver::ModuleResolver;
use crate::symbols::Symbol;
use crate::workspace_index::WorkspaceSymbolIndex;

/// The definition of the name under `position` in the document at `path`.
pub fn provide_definition(
    resolver: &ModuleResolver,
    index: &mut WorkspaceSymbolIndex,
    path: &Path,
    text: &str,
    position: lsp_types::Position,
) -> Option<Symbol> {
    let word = word_at(text, position)?;
    let (module_alias, symbol_name) = word.rsplit_once('.').unwrap_or(("", word));
    tracing::debug!(word, module_alias, symbol_name, "Resolving definition");

    let current = resolver.module_from_path(path)?;

    let mut candidates: Vec<&str> = current
        .imports
        .iter()
        .filter(|import| {
            if module_alias.is_empty() {
                import.exposes_name(symbol_name) || exposes_constructor(resolver, import, symbol_name)
            } else {
                import.alias.as_deref() == Some(module_alias) || import.module == module_alias
            }
        })
        .map(|import| import.module.as_str())
        .collect();
    if candidates.is_empty() {
        candidates.push(&current.name);
    }

    let found: Vec<Symbol> = candidates
        .iter()
        .flat_map(|module| index.provide_workspace_symbols(&format!("{module}:{symbol_name}")))
        .collect();
    if let Some(best) = best_match(found) {
        return Some(best);
    }

    if !module_alias.is_empty() {
        return None;
    }
    current
        .imports
        .iter()
        .filter(|import| import.exposes_all)
        .find_map(|import| {
            best_match(
                index.provide_workspace_symbols(&format!("{}:{symbol_name}", import.module)),
            )
        })
}

/// Whether `name` is a constructor brought in by a `Type(..)` entry.
fn exposes_constructor(resolver: &ModuleResolver, import: &ImportDeclaration, name: &str) -> bool {
    if !name.starts_with(|c: char| c.is_uppercase()) {
        return false;
    }
    let mut open_types = import.open_types().peekable();
    if open_types.peek().is_none() {
        return false;
    }
    let Some(module) = resolver.module_from_name(&import.module) else {
        return false;
    };
    open_types.any(|ty| module.constructors_of(ty).any(|ctor| ctor.name == name))
}

/// Highest-ranked symbol; the earliest wins among equals.
fn best_match(symbols: Vec<Symbol>) -> Option<Symbol> {
    symbols.into_iter().fold(None, |best, symbol| match best {
        Some(best) if best.kind.rank() >= symbol.kind.rank() => Some(best),
        _ => Some(symbol),
    })
}

/// The dotted identifier under the cursor, or `None` where no definition
/// can be looked up (whitespace, numbers, comments, literals).
pub fn word_at(text: &str, position: lsp_types::Position) -> Option<&str> {
    let lines = LineIndex::new(text);
    let line = lines.line_text(position.line)?;
    let offset = lines.offset(position.line, position.character)?;
    let line_start = lines.offset(position.line, 0)?;
    let cursor = offset - line_start;

    let start = line[..cursor]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word_char(c))
        .last()
        .map_or(cursor, |(i, _)| i);
    let end = line[cursor..]
        .char_indices()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(line.len(), |(i, _)| cursor + i);

    let masked = mask_comments(text);
    let span = line_start + start..line_start + end;
    if masked.as_bytes().get(span.clone()) != text.as_bytes().get(span) {
        return None;
    }

    let word = line[start..end].trim_matches('.');
    if word.is_empty() || word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    Some(word)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\'' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;
    use lsp_types::Position;

    fn word(text: &str, line: u32, character: u32) -> Option<&str> {
        word_at(text, Position::new(line, character))
    }

    #[test]
    fn test_word_at_cursor() {
        let text = "view model =\n    Html.text (String.fromInt model.count)";
        assert_eq!(word(text, 0, 2), Some("view"));
        assert_eq!(word(text, 0, 4), Some("view"));
        assert_eq!(word(text, 1, 6), Some("Html.text"));
        assert_eq!(word(text, 1, 22), Some("String.fromInt"));
        assert_eq!(word(text, 1, 35), Some("model.count"));
    }

    #[test]
    fn test_no_word() {
        let text = "x =\n    1.5 + 2\n-- view\n";
        assert_eq!(word(text, 0, 2), None);
        assert_eq!(word(text, 1, 5), None);
        assert_eq!(word(text, 2, 4), None);
        assert_eq!(word(text, 9, 0), None);
    }

    #[test]
    fn test_no_word_inside_comments_or_strings() {
        let text = "{- see\n   helper\n-}\nx = foo -- bar\ny = \"baz\"\n";
        assert_eq!(word(text, 1, 5), None);
        assert_eq!(word(text, 3, 5), Some("foo"));
        assert_eq!(word(text, 3, 12), None);
        assert_eq!(word(text, 4, 6), None);
    }

    #[test]
    fn test_trailing_dot_trimmed() {
        assert_eq!(word("a = Foo.", 0, 6), Some("Foo"));
    }

    fn symbol(name: &str, kind: SymbolKind, module: &str) -> Symbol {
        Symbol {
            name: name.to_owned(),
            kind,
            container_name: module.to_owned(),
            location: lsp_types::Location {
                uri: "file:///w/A.elm".parse().unwrap(),
                range: Default::default(),
            },
        }
    }

    #[test]
    fn test_best_match_prefers_rank_then_order() {
        let best = best_match(vec![
            symbol("T", SymbolKind::Variable, "A"),
            symbol("T", SymbolKind::Class, "B"),
            symbol("T", SymbolKind::Class, "C"),
        ])
        .unwrap();
        assert_eq!(best.container_name, "B");
        assert!(best_match(Vec::new()).is_none());
    }
}
