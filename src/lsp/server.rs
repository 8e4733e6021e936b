//! LSP server implementation using lsp-server (synchronous).
//!
//! Requests and notifications are handled one at a time against a single
//! workspace [`Session`].

use std::error::Error;
use std::path::PathBuf;

use elm_ls::uri::uri_to_path;
use elm_ls::{Config, Session};
use lsp_server::{Connection, Message, Notification, Request, RequestId, Response};
use lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    DocumentSymbolParams, DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse,
    InitializeParams, OneOf, ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions, WorkspaceSymbolParams,
    WorkspaceSymbolResponse,
    notification::{
        DidChangeConfiguration, DidChangeTextDocument, DidChangeWatchedFiles,
        DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument,
    },
    request::{DocumentSymbolRequest, GotoDefinition, WorkspaceSymbolRequest},
};

/// Main LSP server state.
struct LspServer {
    connection: Connection,
    session: Session,
}

impl LspServer {
    fn new(connection: Connection, session: Session) -> Self {
        Self {
            connection,
            session,
        }
    }

    fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        loop {
            let msg = self.connection.receiver.recv()?;
            if self.process_message(msg)? {
                return Ok(());
            }
        }
    }

    /// Process a single message. Returns `Ok(true)` if shutdown was requested.
    fn process_message(&mut self, msg: Message) -> Result<bool, Box<dyn Error + Send + Sync>> {
        match msg {
            Message::Request(req) => {
                if self.connection.handle_shutdown(&req)? {
                    return Ok(true);
                }
                self.handle_request(req)?;
            }
            Message::Response(_) => {
                // We don't send requests, so we shouldn't get responses
            }
            Message::Notification(notif) => {
                self.handle_notification(notif);
            }
        }
        Ok(false)
    }

    fn handle_request(&mut self, req: Request) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(method = %req.method, "Received request");

        let response = if let Some((id, params)) = cast_request::<GotoDefinition>(req.clone()) {
            Response::new_ok(id, self.goto_definition(params))
        } else if let Some((id, params)) = cast_request::<DocumentSymbolRequest>(req.clone()) {
            Response::new_ok(id, self.document_symbols(params))
        } else if let Some((id, params)) = cast_request::<WorkspaceSymbolRequest>(req.clone()) {
            Response::new_ok(id, self.workspace_symbols(params))
        } else {
            tracing::debug!(method = %req.method, "Unsupported request");
            Response::new_err(
                req.id,
                lsp_server::ErrorCode::MethodNotFound as i32,
                format!("unsupported request: {}", req.method),
            )
        };
        self.connection.sender.send(Message::Response(response))?;
        Ok(())
    }

    fn handle_notification(&mut self, notif: Notification) {
        if let Some(params) = cast_notification::<DidOpenTextDocument>(notif.clone()) {
            self.did_open(params);
        } else if let Some(params) = cast_notification::<DidChangeTextDocument>(notif.clone()) {
            self.did_change(params);
        } else if let Some(params) = cast_notification::<DidSaveTextDocument>(notif.clone()) {
            self.did_save(params);
        } else if let Some(params) = cast_notification::<DidCloseTextDocument>(notif.clone()) {
            self.did_close(params);
        } else if let Some(params) = cast_notification::<DidChangeConfiguration>(notif.clone()) {
            self.did_change_configuration(params);
        } else if let Some(params) = cast_notification::<DidChangeWatchedFiles>(notif) {
            self.did_change_watched_files(params);
        }
    }

    fn did_open(&mut self, params: DidOpenTextDocumentParams) {
        self.session
            .open_document(&params.text_document.uri, &params.text_document.text);
    }

    fn did_change(&mut self, params: DidChangeTextDocumentParams) {
        self.session
            .change_document(&params.text_document.uri, params.content_changes);
    }

    fn did_save(&mut self, params: DidSaveTextDocumentParams) {
        self.session
            .save_document(&params.text_document.uri, params.text.as_deref());
    }

    fn did_close(&mut self, params: DidCloseTextDocumentParams) {
        self.session.close_document(&params.text_document.uri);
    }

    fn did_change_configuration(&mut self, params: DidChangeConfigurationParams) {
        match Config::from_value(&params.settings) {
            Ok(config) => self.session.reconfigure(config),
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed configuration"),
        }
    }

    fn did_change_watched_files(&mut self, params: DidChangeWatchedFilesParams) {
        tracing::debug!(changes = params.changes.len(), "Watched files changed");
        self.session.files_changed(params.changes);
    }

    fn goto_definition(&mut self, params: GotoDefinitionParams) -> Option<GotoDefinitionResponse> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        tracing::debug!(
            line = position.line,
            character = position.character,
            "Go to Definition request"
        );

        let symbol = self.session.definition(uri, position)?;

        tracing::debug!(
            name = %symbol.name,
            kind = ?symbol.kind,
            module = %symbol.container_name,
            "Found definition"
        );

        Some(GotoDefinitionResponse::Scalar(symbol.location))
    }

    fn document_symbols(&self, params: DocumentSymbolParams) -> Option<DocumentSymbolResponse> {
        let symbols = self.session.document_symbols(&params.text_document.uri);
        tracing::debug!(symbols = symbols.len(), "Document symbols response");
        Some(DocumentSymbolResponse::Flat(
            symbols.iter().map(|s| s.to_symbol_information()).collect(),
        ))
    }

    fn workspace_symbols(&mut self, params: WorkspaceSymbolParams) -> Option<WorkspaceSymbolResponse> {
        let symbols = self.session.workspace_symbols(&params.query);
        Some(WorkspaceSymbolResponse::Flat(
            symbols.iter().map(|s| s.to_symbol_information()).collect(),
        ))
    }
}

/// Get the server capabilities for the Elm LSP server.
fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                ..Default::default()
            },
        )),
        document_symbol_provider: Some(OneOf::Left(true)),
        workspace_symbol_provider: Some(OneOf::Left(true)),
        definition_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

/// Workspace root: the first workspace folder, else the root URI, else the
/// current directory.
#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> PathBuf {
    params
        .workspace_folders
        .iter()
        .flatten()
        .map(|folder| &folder.uri)
        .chain(params.root_uri.as_ref())
        .find_map(uri_to_path)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

/// Initialize the LSP server with the given connection.
///
/// This performs the LSP initialize handshake and returns a ready-to-run server.
fn initialize_server(connection: Connection) -> Result<LspServer, Box<dyn Error + Send + Sync>> {
    let capabilities = server_capabilities();
    let server_capabilities = serde_json::to_value(&capabilities)?;
    let init_params = connection.initialize(server_capabilities)?;
    let params: InitializeParams = serde_json::from_value(init_params)?;

    let root = workspace_root(&params);
    let config = match params.initialization_options.as_ref().map(Config::from_value) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Ignoring malformed initialization options");
            Config::default()
        }
        None => Config::default(),
    };
    tracing::info!(root = %root.display(), "Initialized");
    Ok(LspServer::new(connection, Session::new(root, config)))
}

/// Start the LSP server.
pub fn serve() -> Result<(), Box<dyn Error + Send + Sync>> {
    let (connection, io_threads) = Connection::stdio();

    let mut server = initialize_server(connection)?;
    server.run()?;

    io_threads.join()?;
    Ok(())
}

/// Cast a request to a specific type.
fn cast_request<R: lsp_types::request::Request>(req: Request) -> Option<(RequestId, R::Params)> {
    if req.method == R::METHOD {
        let params = serde_json::from_value(req.params).ok()?;
        Some((req.id, params))
    } else {
        None
    }
}

/// Cast a notification to a specific type.
fn cast_notification<N: lsp_types::notification::Notification>(
    notif: Notification,
) -> Option<N::Params> {
    if notif.method == N::METHOD {
        serde_json::from_value(notif.params).ok()
    } else {
        None
    }
}
