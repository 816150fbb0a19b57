//! LSP server implementation

use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, warn};

use crate::config::{UserConfig, load_config};
use crate::session::{Document, Registry, Ticket, run_analysis};

/// The FreeSpace table language server
pub struct FsoTableServer {
    /// LSP client for sending notifications
    client: Client,
    /// Open documents
    documents: Registry,
    config: UserConfig,
}

impl FsoTableServer {
    pub fn new(client: Client) -> Self {
        let config = match load_config() {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                warn!("{}, using defaults", e);
                UserConfig::default()
            }
        };
        Self::with_config(client, config)
    }

    pub fn with_config(client: Client, config: UserConfig) -> Self {
        Self {
            client,
            documents: Registry::new(),
            config,
        }
    }

    /// Run the analysis behind `ticket` off the request path.
    fn spawn_analysis(&self, document: Arc<Document>, ticket: Ticket) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let status = run_analysis(document, ticket, &client).await;
            debug!(?status, "Analysis finished");
        });
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for FsoTableServer {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Columns are converted to and from UTF-16 code units
                position_encoding: Some(PositionEncodingKind::UTF16),
                // Incremental sync - we get ranged edits and apply them in order
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                // Hover information
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "fsotbl-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "FreeSpace table language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let table = self.config.table_for(uri.path());

        let document = self
            .documents
            .open(uri, params.text_document.text, params.text_document.version, table)
            .await;
        let ticket = document.begin(self.config.analysis_timeout()).await;
        self.spawn_analysis(document, ticket);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(document) = self.documents.get(&uri).await else {
            warn!(%uri, "Change for a document that is not open");
            return;
        };

        let ticket = document
            .edit(
                params.text_document.version,
                params.content_changes,
                self.config.analysis_timeout(),
            )
            .await;
        self.spawn_analysis(document, ticket);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        self.documents.close(&uri).await;

        // Clear diagnostics
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(document) = self.documents.get(&uri).await else {
            return Ok(None);
        };
        Ok(document.hover(position).await)
    }
}

/// Run the LSP server on stdin/stdout
pub async fn run() -> eyre::Result<()> {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(FsoTableServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
