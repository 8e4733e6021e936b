//! Language Server Protocol front end.
//!
//! Provides document symbols, workspace symbols and go-to-definition for
//! Elm projects over stdio.

mod server;

pub use server::serve;
