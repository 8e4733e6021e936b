//! Declaration-level parsing of Elm modules.
//!
//! [`parse_module`] turns module source text into a [`ParsedModule`]: the
//! module name, its imports, and the names and locations of its top-level
//! types, constructors, functions and ports. Function bodies are skipped.

pub mod ast;
mod layout;
pub mod line_index;
mod parser;

pub use ast::*;
pub use layout::mask_comments;
pub use line_index::LineIndex;
pub use parser::{ParseError, parse_module};
