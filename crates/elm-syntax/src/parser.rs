//! Winnow parsers for Elm top-level declarations.
//!
//! Each top-level chunk (see [`crate::layout`]) is parsed on its own into a
//! raw declaration holding slices of the masked source; locations are
//! resolved afterwards against the unmasked text.

use winnow::combinator::{alt, delimited, eof, opt, preceded, repeat, separated, terminated};
use winnow::prelude::*;
use winnow::stream::{Offset, Stream};
use winnow::token::{one_of, rest, take_till, take_while};

use crate::ast::{
    Constructor, CustomType, ExposedItem, FunctionDeclaration, ImportDeclaration, Location,
    ModuleKind, ParsedModule, PortDeclaration, TypeAlias, TypeDeclaration,
};
use crate::layout::{BOM, mask_comments, top_level_chunks};
use crate::line_index::LineIndex;

/// Error produced when a module cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

// ============================================================================
// Raw declarations
// ============================================================================

#[derive(Debug, Clone)]
enum RawMembers<'a> {
    All,
    Listed(Vec<&'a str>),
}

#[derive(Debug, Clone)]
enum RawExposed<'a> {
    All(&'a str),
    /// A lower-case value or a parenthesized operator.
    Value(&'a str),
    Type {
        name: &'a str,
        members: Option<RawMembers<'a>>,
    },
}

#[derive(Debug)]
struct RawHeader<'a> {
    kind: ModuleKind,
    name: &'a str,
    exposing: Vec<RawExposed<'a>>,
}

#[derive(Debug, Clone)]
enum RawDecl<'a> {
    Import {
        module: &'a str,
        alias: Option<&'a str>,
        exposing: Vec<RawExposed<'a>>,
    },
    CustomType {
        name: &'a str,
        constructors: Vec<&'a str>,
    },
    TypeAlias(&'a str),
    Port(&'a str),
    Function(&'a str),
    /// Annotations and infix declarations.
    Ignored,
}

// ============================================================================
// Lexical pieces
// ============================================================================

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

fn is_operator_char(c: char) -> bool {
    "+-/*=.<>:&|^?%!~@#$\\".contains(c)
}

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., char::is_whitespace)
        .void()
        .parse_next(input)
}

fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., char::is_whitespace)
        .void()
        .parse_next(input)
}

/// Require an `=` ahead and consume the rest of the chunk.
fn body(input: &mut &str) -> ModalResult<()> {
    (take_till(0.., '='), '=', rest).void().parse_next(input)
}

fn upper_ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_uppercase()),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)
}

fn lower_ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_lowercase() || c == '_'),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)
}

/// Parse a parenthesized operator such as `(|>)`, including the parens.
fn operator<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    ('(', take_while(1.., is_operator_char), ')')
        .take()
        .parse_next(input)
}

/// Parse a dotted module name: `List.Extra`.
fn module_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        upper_ident,
        repeat(0.., ('.', upper_ident)).map(|()| ()),
    )
        .take()
        .parse_next(input)
}

fn value_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((operator, lower_ident)).parse_next(input)
}

// ============================================================================
// Exposing lists
// ============================================================================

/// Parse `(..)` or `(A, B)` after an exposed type name.
fn type_members<'a>(input: &mut &'a str) -> ModalResult<RawMembers<'a>> {
    delimited(
        ('(', ws),
        alt((
            "..".value(RawMembers::All),
            separated(1.., upper_ident, (ws, ',', ws)).map(RawMembers::Listed),
        )),
        (ws, ')'),
    )
    .parse_next(input)
}

fn exposed_item<'a>(input: &mut &'a str) -> ModalResult<RawExposed<'a>> {
    alt((
        value_name.map(RawExposed::Value),
        (upper_ident, opt(preceded(ws, type_members)))
            .map(|(name, members)| RawExposed::Type { name, members }),
    ))
    .parse_next(input)
}

fn exposing_list<'a>(input: &mut &'a str) -> ModalResult<Vec<RawExposed<'a>>> {
    preceded(
        ("exposing", ws, '(', ws),
        terminated(
            alt((
                "..".map(|dots| vec![RawExposed::All(dots)]),
                separated(1.., exposed_item, (ws, ',', ws)),
            )),
            (ws, ')'),
        ),
    )
    .parse_next(input)
}

// ============================================================================
// Declarations
// ============================================================================

/// `effect module Task where { command = MyCmd } exposing (..)`
fn effect_where(input: &mut &str) -> ModalResult<()> {
    ("where", ws, '{', take_till(0.., '}'), '}', ws)
        .void()
        .parse_next(input)
}

fn module_header<'a>(input: &mut &'a str) -> ModalResult<RawHeader<'a>> {
    let kind = opt(terminated(
        alt((
            "port".value(ModuleKind::Port),
            "effect".value(ModuleKind::Effect),
        )),
        ws1,
    ))
    .parse_next(input)?
    .unwrap_or(ModuleKind::Plain);
    ("module", ws1).parse_next(input)?;
    let name = module_name.parse_next(input)?;
    ws.parse_next(input)?;
    if kind == ModuleKind::Effect {
        opt(effect_where).parse_next(input)?;
    }
    let exposing = exposing_list.parse_next(input)?;
    (ws, eof).parse_next(input)?;
    Ok(RawHeader {
        kind,
        name,
        exposing,
    })
}

fn import<'a>(input: &mut &'a str) -> ModalResult<RawDecl<'a>> {
    ("import", ws1).parse_next(input)?;
    let module = module_name.parse_next(input)?;
    let alias = opt(preceded((ws1, "as", ws1), upper_ident)).parse_next(input)?;
    let exposing = opt(preceded(ws, exposing_list))
        .parse_next(input)?
        .unwrap_or_default();
    (ws, eof).parse_next(input)?;
    Ok(RawDecl::Import {
        module,
        alias,
        exposing,
    })
}

fn type_alias<'a>(input: &mut &'a str) -> ModalResult<RawDecl<'a>> {
    ("type", ws1, "alias", ws1).parse_next(input)?;
    let name = upper_ident.parse_next(input)?;
    body.parse_next(input)?;
    Ok(RawDecl::TypeAlias(name))
}

/// Skip a constructor's arguments, stopping at a `|` outside any brackets.
fn constructor_args(input: &mut &str) -> ModalResult<()> {
    let mut depth = 0usize;
    let len = input
        .char_indices()
        .find(|&(_, c)| match c {
            '(' | '[' | '{' => {
                depth += 1;
                false
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                false
            }
            '|' => depth == 0,
            _ => false,
        })
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    let _ = input.next_slice(len);
    Ok(())
}

fn constructor<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    terminated(upper_ident, constructor_args).parse_next(input)
}

fn custom_type<'a>(input: &mut &'a str) -> ModalResult<RawDecl<'a>> {
    ("type", ws1).parse_next(input)?;
    let name = upper_ident.parse_next(input)?;
    repeat(0.., preceded(ws1, lower_ident))
        .map(|()| ())
        .parse_next(input)?;
    (ws, '=', ws).parse_next(input)?;
    let constructors = separated(1.., constructor, (ws, '|', ws)).parse_next(input)?;
    (ws, eof).parse_next(input)?;
    Ok(RawDecl::CustomType { name, constructors })
}

fn port<'a>(input: &mut &'a str) -> ModalResult<RawDecl<'a>> {
    ("port", ws1).parse_next(input)?;
    let name = lower_ident.parse_next(input)?;
    (ws, ':', rest).parse_next(input)?;
    Ok(RawDecl::Port(name))
}

fn infix(input: &mut &str) -> ModalResult<()> {
    (alt(("infixl", "infixr", "infix")), ws1, rest)
        .void()
        .parse_next(input)
}

fn annotation(input: &mut &str) -> ModalResult<()> {
    (value_name, ws, ':', rest).void().parse_next(input)
}

fn function<'a>(input: &mut &'a str) -> ModalResult<RawDecl<'a>> {
    let name = value_name.parse_next(input)?;
    body.parse_next(input)?;
    Ok(RawDecl::Function(name))
}

fn declaration<'a>(input: &mut &'a str) -> ModalResult<RawDecl<'a>> {
    alt((
        import,
        type_alias,
        custom_type,
        port,
        infix.value(RawDecl::Ignored),
        annotation.value(RawDecl::Ignored),
        function,
    ))
    .parse_next(input)
}

// ============================================================================
// Assembly
// ============================================================================

/// Resolves raw slices of the masked source to locations in the source text.
struct Locator<'s> {
    masked: &'s str,
    lines: LineIndex<'s>,
}

impl Locator<'_> {
    fn locate(&self, slice: &str) -> Location {
        let start = slice.offset_from(&self.masked);
        Location {
            start: self.lines.position(start),
            end: self.lines.position(start + slice.len()),
        }
    }

    fn exposed(&self, raw: Vec<RawExposed<'_>>) -> Vec<ExposedItem> {
        let mut items = Vec::with_capacity(raw.len());
        for item in raw {
            match item {
                RawExposed::All(dots) => items.push(ExposedItem::All {
                    location: self.locate(dots),
                }),
                RawExposed::Value(name) => items.push(ExposedItem::Function {
                    name: strip_parens(name).to_owned(),
                    location: self.locate(name),
                }),
                RawExposed::Type { name, members } => {
                    items.push(ExposedItem::Type {
                        name: name.to_owned(),
                        open: matches!(members, Some(RawMembers::All)),
                        location: self.locate(name),
                    });
                    if let Some(RawMembers::Listed(constructors)) = members {
                        items.extend(constructors.into_iter().map(|ctor| {
                            ExposedItem::Constructor {
                                name: ctor.to_owned(),
                                type_name: name.to_owned(),
                                location: self.locate(ctor),
                            }
                        }));
                    }
                }
            }
        }
        items
    }
}

fn strip_parens(name: &str) -> &str {
    name.strip_prefix('(')
        .and_then(|n| n.strip_suffix(')'))
        .unwrap_or(name)
}

/// Parse an Elm module into its declaration-level description.
///
/// Fails when the module header is missing or any top-level form is not
/// recognized; callers that only want best-effort results treat the error
/// as "no module".
pub fn parse_module(source: &str) -> Result<ParsedModule, ParseError> {
    let masked = mask_comments(source);
    let locator = Locator {
        masked: &masked,
        lines: LineIndex::new(source),
    };
    // A byte order mark is blanked by the mask; the header still counts as
    // starting in column 0.
    let bom = if source.starts_with(BOM) { BOM.len_utf8() } else { 0 };
    let chunks: Vec<_> = top_level_chunks(&masked[bom..])
        .into_iter()
        .map(|chunk| chunk.start + bom..chunk.end + bom)
        .collect();

    let Some((first, rest)) = chunks.split_first() else {
        return Err(ParseError {
            message: "missing module declaration".to_owned(),
            offset: 0,
        });
    };

    let mut remaining = &masked[first.clone()];
    let header = module_header
        .parse_next(&mut remaining)
        .map_err(|e| ParseError {
            message: format!("invalid module declaration: {}", e),
            offset: first.end - remaining.len(),
        })?;

    let mut module = ParsedModule {
        name: header.name.to_owned(),
        kind: header.kind,
        exposing: locator.exposed(header.exposing),
        imports: Vec::new(),
        types: Vec::new(),
        functions: Vec::new(),
        ports: Vec::new(),
        location: locator.locate(header.name),
    };

    for chunk in rest {
        let mut remaining = &masked[chunk.clone()];
        let decl = declaration
            .parse_next(&mut remaining)
            .map_err(|e| ParseError {
                message: format!("unrecognized top-level declaration: {}", e),
                offset: chunk.end - remaining.len(),
            })?;

        match decl {
            RawDecl::Import {
                module: name,
                alias,
                exposing,
            } => {
                let exposing = locator.exposed(exposing);
                module.imports.push(ImportDeclaration {
                    module: name.to_owned(),
                    alias: alias.map(str::to_owned),
                    exposes_all: exposing
                        .iter()
                        .any(|item| matches!(item, ExposedItem::All { .. })),
                    exposing,
                    location: locator.locate(name),
                });
            }
            RawDecl::CustomType { name, constructors } => {
                module.types.push(TypeDeclaration::CustomType(CustomType {
                    name: name.to_owned(),
                    constructors: constructors
                        .into_iter()
                        .map(|ctor| Constructor {
                            name: ctor.to_owned(),
                            location: locator.locate(ctor),
                        })
                        .collect(),
                    location: locator.locate(name),
                }));
            }
            RawDecl::TypeAlias(name) => {
                module.types.push(TypeDeclaration::TypeAlias(TypeAlias {
                    name: name.to_owned(),
                    location: locator.locate(name),
                }));
            }
            RawDecl::Port(name) => module.ports.push(PortDeclaration {
                name: name.to_owned(),
                location: locator.locate(name),
            }),
            RawDecl::Function(name) => module.functions.push(FunctionDeclaration {
                name: strip_parens(name).to_owned(),
                location: locator.locate(name),
            }),
            RawDecl::Ignored => {}
        }
    }

    Ok(module)
}
