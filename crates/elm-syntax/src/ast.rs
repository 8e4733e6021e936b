//! Declaration-level description of an Elm module.
//!
//! Only the parts of a module that matter for navigation are kept: the
//! header, imports, and the names of top-level types, functions and ports.
//! Expressions are never parsed.

/// A point in the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, in UTF-16 code units.
    pub column: u32,
}

/// Source span of a declaration's name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

/// A parsed module. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedModule {
    /// Dotted module name, e.g. `List.Extra`.
    pub name: String,
    pub kind: ModuleKind,
    /// Names exposed by the module header.
    pub exposing: Vec<ExposedItem>,
    pub imports: Vec<ImportDeclaration>,
    pub types: Vec<TypeDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub ports: Vec<PortDeclaration>,
    /// Location of the module name in the header.
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Plain,
    Port,
    Effect,
}

/// `import Module [as Alias] [exposing (...)]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDeclaration {
    pub module: String,
    pub alias: Option<String>,
    /// True when the exposing list is `(..)`.
    pub exposes_all: bool,
    pub exposing: Vec<ExposedItem>,
    pub location: Location,
}

impl ImportDeclaration {
    /// Whether `name` is listed explicitly in this import's exposing list.
    ///
    /// Wildcards do not count, and neither do constructors hidden behind
    /// `Type(..)`; those need the imported module to decide.
    pub fn exposes_name(&self, name: &str) -> bool {
        self.exposing.iter().any(|item| match item {
            ExposedItem::All { .. } => false,
            ExposedItem::Function { name: exposed, .. }
            | ExposedItem::Type { name: exposed, .. }
            | ExposedItem::Constructor { name: exposed, .. } => exposed == name,
        })
    }

    /// Types exposed together with all of their constructors (`Type(..)`).
    pub fn open_types(&self) -> impl Iterator<Item = &str> {
        self.exposing.iter().filter_map(|item| match item {
            ExposedItem::Type {
                name, open: true, ..
            } => Some(name.as_str()),
            ExposedItem::All { .. }
            | ExposedItem::Type { .. }
            | ExposedItem::Function { .. }
            | ExposedItem::Constructor { .. } => None,
        })
    }
}

/// One entry of an `exposing (...)` list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExposedItem {
    /// `exposing (..)`
    All { location: Location },
    /// A value or operator: `map`, `(|>)`.
    Function { name: String, location: Location },
    /// A type. `open` is set for `Type(..)`.
    Type {
        name: String,
        open: bool,
        location: Location,
    },
    /// A constructor listed explicitly, as in `Maybe(Just)`.
    Constructor {
        name: String,
        type_name: String,
        location: Location,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDeclaration {
    CustomType(CustomType),
    TypeAlias(TypeAlias),
}

impl TypeDeclaration {
    pub fn name(&self) -> &str {
        match self {
            TypeDeclaration::CustomType(ty) => &ty.name,
            TypeDeclaration::TypeAlias(alias) => &alias.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomType {
    pub name: String,
    pub constructors: Vec<Constructor>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constructor {
    pub name: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAlias {
    pub name: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortDeclaration {
    pub name: String,
    pub location: Location,
}

impl ParsedModule {
    /// Constructors of the custom type `type_name`, if this module declares it.
    pub fn constructors_of(&self, type_name: &str) -> impl Iterator<Item = &Constructor> {
        self.types
            .iter()
            .filter_map(move |ty| match ty {
                TypeDeclaration::CustomType(custom) if custom.name == type_name => {
                    Some(custom.constructors.iter())
                }
                TypeDeclaration::CustomType(_) | TypeDeclaration::TypeAlias(_) => None,
            })
            .flatten()
    }
}
