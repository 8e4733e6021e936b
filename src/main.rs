//! Elm language server entry point.

mod cli;
mod lsp;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use elm_ls::symbols::document_symbols;
use elm_ls::uri::path_to_uri;
use elm_ls::{Config, Session, Symbol};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        // stdout carries the LSP stream; logs are plain text on stderr.
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            if let Err(e) = lsp::serve() {
                eprintln!("LSP server error: {e}");
                return ExitCode::FAILURE;
            }
        }
        Command::Symbols { file } => {
            if let Err(e) = print_file_symbols(&file) {
                eprintln!("Error reading {}: {e}", file.display());
                return ExitCode::FAILURE;
            }
        }
        Command::Query { root, query } => {
            if let Err(e) = print_query(&root, &query) {
                eprintln!("Error querying {}: {e}", root.display());
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn print_file_symbols(path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let text = std::fs::read_to_string(path)?;
    let uri = path_to_uri(&std::path::absolute(path)?)?;
    for symbol in document_symbols(&uri, &text) {
        println!("{}", render_symbol(&symbol));
    }
    Ok(())
}

fn print_query(root: &Path, query: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut session = Session::new(std::path::absolute(root)?, Config::default());
    let mut symbols = session.workspace_symbols(query);
    symbols.sort_by(|a, b| {
        (a.location.uri.as_str(), a.location.range.start.line)
            .cmp(&(b.location.uri.as_str(), b.location.range.start.line))
    });
    for symbol in &symbols {
        println!("{}", render_symbol(symbol));
    }
    Ok(())
}

fn render_symbol(symbol: &Symbol) -> String {
    let start = symbol.location.range.start;
    format!(
        "{:<12} {}.{}  {}:{}:{}",
        format!("{:?}", symbol.kind),
        symbol.container_name,
        symbol.name,
        symbol.location.uri.as_str(),
        start.line + 1,
        start.character + 1
    )
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "elm_ls=info",
        1 => "elm_ls=debug",
        _ => "elm_ls=trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_defaults() {
        assert_eq!(directive_for_verbosity(0), "elm_ls=info");
        assert_eq!(directive_for_verbosity(1), "elm_ls=debug");
        assert_eq!(directive_for_verbosity(5), "elm_ls=trace");
    }

    #[test]
    fn cli_parses_query() {
        let cli = Cli::parse_from(["elm-ls", "-v", "query", "--root", "/w", "Main:main"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Query { root, query } => {
                assert_eq!(root, Path::new("/w"));
                assert_eq!(query, "Main:main");
            }
            Command::Serve | Command::Symbols { .. } => panic!("expected query"),
        }
    }

    #[test]
    fn cli_lsp_alias() {
        let cli = Cli::parse_from(["elm-ls", "lsp"]);
        assert!(matches!(cli.command, Command::Serve));
    }
}
