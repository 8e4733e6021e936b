//! Flattening a parsed module into located symbols.

use elm_syntax::{Location, ParsedModule, TypeDeclaration, parse_module};
use lsp_types::{Range, SymbolInformation, Uri};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    /// Custom types and type aliases.
    Class,
    Constructor,
    /// Functions and values.
    Variable,
    /// Ports.
    Interface,
}

impl SymbolKind {
    /// Preference when several definitions match one reference; higher wins.
    pub fn rank(self) -> u8 {
        match self {
            SymbolKind::Constructor => 4,
            SymbolKind::Class => 3,
            SymbolKind::Interface => 2,
            SymbolKind::Variable => 1,
            SymbolKind::Module => 0,
        }
    }
}

impl From<SymbolKind> for lsp_types::SymbolKind {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Module => lsp_types::SymbolKind::MODULE,
            SymbolKind::Class => lsp_types::SymbolKind::CLASS,
            SymbolKind::Constructor => lsp_types::SymbolKind::CONSTRUCTOR,
            SymbolKind::Variable => lsp_types::SymbolKind::VARIABLE,
            SymbolKind::Interface => lsp_types::SymbolKind::INTERFACE,
        }
    }
}

/// A named declaration and where it lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Name of the declaring module.
    pub container_name: String,
    pub location: lsp_types::Location,
}

impl Symbol {
    #[allow(deprecated)]
    pub fn to_symbol_information(&self) -> SymbolInformation {
        SymbolInformation {
            name: self.name.clone(),
            kind: self.kind.into(),
            tags: None,
            deprecated: None,
            location: self.location.clone(),
            container_name: Some(self.container_name.clone()),
        }
    }
}

/// Every symbol a module declares: its types, constructors, functions and
/// ports, then the module itself.
pub fn extract_symbols(module: &ParsedModule, uri: &Uri) -> Vec<Symbol> {
    let symbol = |name: &str, kind, location: &Location| Symbol {
        name: name.to_owned(),
        kind,
        container_name: module.name.clone(),
        location: lsp_types::Location {
            uri: uri.clone(),
            range: to_range(location),
        },
    };

    let mut symbols = Vec::new();
    for ty in &module.types {
        match ty {
            TypeDeclaration::CustomType(custom) => {
                symbols.push(symbol(&custom.name, SymbolKind::Class, &custom.location));
                symbols.extend(custom.constructors.iter().map(|ctor| {
                    symbol(&ctor.name, SymbolKind::Constructor, &ctor.location)
                }));
            }
            TypeDeclaration::TypeAlias(alias) => {
                symbols.push(symbol(&alias.name, SymbolKind::Class, &alias.location));
            }
        }
    }
    symbols.extend(
        module
            .functions
            .iter()
            .map(|f| symbol(&f.name, SymbolKind::Variable, &f.location)),
    );
    symbols.extend(
        module
            .ports
            .iter()
            .map(|p| symbol(&p.name, SymbolKind::Interface, &p.location)),
    );
    symbols.push(symbol(&module.name, SymbolKind::Module, &module.location));
    symbols
}

/// Symbols of a document's text; empty when it does not parse.
pub fn document_symbols(uri: &Uri, text: &str) -> Vec<Symbol> {
    match parse_module(text) {
        Ok(module) => extract_symbols(&module, uri),
        Err(e) => {
            tracing::debug!(uri = uri.as_str(), error = %e, "No symbols for unparsable document");
            Vec::new()
        }
    }
}

/// Convert a parsed location (1-based) to an LSP range (0-based).
pub fn to_range(location: &Location) -> Range {
    let position = |p: &elm_syntax::Position| {
        lsp_types::Position::new(p.line.saturating_sub(1), p.column.saturating_sub(1))
    };
    Range {
        start: position(&location.start),
        end: position(&location.end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Uri {
        "file:///w/src/Shapes.elm".parse().unwrap()
    }

    fn names_of(symbols: &[Symbol], kind: SymbolKind) -> Vec<&str> {
        let mut names: Vec<&str> = symbols
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.name.as_str())
            .collect();
        names.sort();
        names
    }

    const SHAPES: &str = "\
port module Shapes exposing (..)

type Shape
    = Circle Float
    | Rect Float Float

type alias Point =
    { x : Float, y : Float }

area : Shape -> Float
area shape =
    0

(%%) a b =
    a

port render : String -> Cmd msg
";

    #[test]
    fn test_symbol_counts_by_kind() {
        let symbols = document_symbols(&uri(), SHAPES);
        assert_eq!(names_of(&symbols, SymbolKind::Module), vec!["Shapes"]);
        assert_eq!(names_of(&symbols, SymbolKind::Class), vec!["Point", "Shape"]);
        assert_eq!(
            names_of(&symbols, SymbolKind::Constructor),
            vec!["Circle", "Rect"]
        );
        assert_eq!(names_of(&symbols, SymbolKind::Variable), vec!["%%", "area"]);
        assert_eq!(names_of(&symbols, SymbolKind::Interface), vec!["render"]);
        assert_eq!(symbols.len(), 8);
        assert!(symbols.iter().all(|s| s.container_name == "Shapes"));
    }

    #[test]
    fn test_module_symbol_range_covers_name() {
        let symbols = document_symbols(&uri(), SHAPES);
        let module = symbols
            .iter()
            .find(|s| s.kind == SymbolKind::Module)
            .unwrap();
        assert_eq!(module.location.uri, uri());
        assert_eq!(
            module.location.range,
            Range {
                start: lsp_types::Position::new(0, 12),
                end: lsp_types::Position::new(0, 18),
            }
        );
    }

    #[test]
    fn test_operator_range_includes_parens() {
        let symbols = document_symbols(&uri(), SHAPES);
        let op = symbols.iter().find(|s| s.name == "%%").unwrap();
        assert_eq!(op.location.range.start, lsp_types::Position::new(13, 0));
        assert_eq!(op.location.range.end, lsp_types::Position::new(13, 4));
    }

    #[test]
    fn test_unparsable_document_has_no_symbols() {
        assert!(document_symbols(&uri(), "").is_empty());
        assert!(document_symbols(&uri(), "module exposing").is_empty());
    }

    #[test]
    fn test_symbol_information() {
        let symbols = document_symbols(&uri(), SHAPES);
        let render = symbols.iter().find(|s| s.name == "render").unwrap();
        let info = render.to_symbol_information();
        assert_eq!(info.kind, lsp_types::SymbolKind::INTERFACE);
        assert_eq!(info.container_name.as_deref(), Some("Shapes"));
    }

    #[test]
    fn test_rank_order() {
        let mut kinds = vec![
            SymbolKind::Module,
            SymbolKind::Variable,
            SymbolKind::Constructor,
            SymbolKind::Interface,
            SymbolKind::Class,
        ];
        kinds.sort_by_key(|k| std::cmp::Reverse(k.rank()));
        assert_eq!(
            kinds,
            vec![
                SymbolKind::Constructor,
                SymbolKind::Class,
                SymbolKind::Interface,
                SymbolKind::Variable,
                SymbolKind::Module,
            ]
        );
    }
}
