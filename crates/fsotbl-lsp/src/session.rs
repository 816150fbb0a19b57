//! Per-document analysis sessions.
//!
//! Every open document owns one lock around its state. Edits are applied
//! under that lock in arrival order and bump a generation counter; each
//! analysis remembers the generation it started from and only publishes if
//! no newer one has begun since. The check and the state update happen under
//! the lock; the diagnostics are sent after it is released, so a slow client
//! never holds up the next edit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fsotbl_parse::{
    Attributes, CancelSignal, Cancelled, Diagnostic, Node, ParseOutput, ScopeInfo, Severity, parse,
};
use fsotbl_tables::TableKind;
use tokio::sync::Mutex;
use tower_lsp::Client;
use tower_lsp::lsp_types::{
    self, Hover, HoverContents, MarkupContent, MarkupKind, TextDocumentContentChangeEvent, Url,
};
use tracing::{debug, error, info, trace};

use crate::convert::{apply_change, from_lsp_position, to_lsp_diagnostic, to_lsp_range};

/// Where an analysis ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    /// Nothing has been analyzed yet.
    Idle,
    Analyzing,
    /// Diagnostics of this run were published.
    Published,
    /// A newer edit arrived before this run finished; its result was dropped.
    Superseded,
    /// The run was cancelled or hit its deadline.
    Cancelled,
}

/// Receives the diagnostics of finished analyses.
#[tower_lsp::async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn publish(&self, uri: Url, diagnostics: Vec<lsp_types::Diagnostic>, version: Option<i32>);
}

#[tower_lsp::async_trait]
impl DiagnosticSink for Client {
    async fn publish(&self, uri: Url, diagnostics: Vec<lsp_types::Diagnostic>, version: Option<i32>) {
        self.publish_diagnostics(uri, diagnostics, version).await;
    }
}

/// Everything an analysis needs, captured when it is scheduled.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    version: i32,
    content: String,
    schema: Arc<Vec<Node>>,
    cancel: CancelSignal,
}

impl Ticket {
    pub fn version(&self) -> i32 {
        self.version
    }

    /// The signal that stops this analysis.
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }
}

struct DocumentState {
    uri: Url,
    content: String,
    version: i32,
    /// Bumped for every scheduled analysis.
    generation: u64,
    schema: Arc<Vec<Node>>,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    /// Hover ranges of the last published analysis. Kept across edits.
    scopes: Vec<ScopeInfo>,
    /// Attribute tree of the last analysis, `None` once the content changed.
    tree: Option<Attributes>,
    /// Signal of the analysis in flight, if any.
    cancel: Option<CancelSignal>,
    status: AnalysisStatus,
}

impl DocumentState {
    fn begin(&mut self, timeout: Duration) -> Ticket {
        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }
        self.generation += 1;
        self.status = AnalysisStatus::Analyzing;

        let cancel = CancelSignal::with_timeout(timeout);
        self.cancel = Some(cancel.clone());
        debug!(uri = %self.uri, version = self.version, generation = self.generation, "Scheduling analysis");

        Ticket {
            generation: self.generation,
            version: self.version,
            content: self.content.clone(),
            schema: Arc::clone(&self.schema),
            cancel,
        }
    }

    fn lsp_diagnostics(&self) -> Vec<lsp_types::Diagnostic> {
        self.errors
            .iter()
            .map(|d| to_lsp_diagnostic(&self.content, d, Severity::Error))
            .chain(
                self.warnings
                    .iter()
                    .map(|d| to_lsp_diagnostic(&self.content, d, Severity::Warning)),
            )
            .collect()
    }
}

/// One open document.
pub struct Document {
    state: Mutex<DocumentState>,
}

impl Document {
    pub fn new(uri: Url, content: String, version: i32, table: TableKind) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                uri,
                content,
                version,
                generation: 0,
                schema: Arc::new(table.schema()),
                errors: Vec::new(),
                warnings: Vec::new(),
                scopes: Vec::new(),
                tree: None,
                cancel: None,
                status: AnalysisStatus::Idle,
            }),
        }
    }

    /// Schedule an analysis of the current content, cancelling the one in flight.
    pub async fn begin(&self, timeout: Duration) -> Ticket {
        self.state.lock().await.begin(timeout)
    }

    /// Apply `changes` in order, then schedule an analysis of the result.
    pub async fn edit(
        &self,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
        timeout: Duration,
    ) -> Ticket {
        let mut state = self.state.lock().await;
        for change in changes {
            apply_change(&mut state.content, change);
        }
        state.version = version;
        state.tree = None;
        trace!(uri = %state.uri, version, "Applied edit");
        state.begin(timeout)
    }

    /// Record the result of the analysis behind `ticket` and publish its
    /// diagnostics, unless a newer analysis has been scheduled meanwhile.
    pub async fn finish<S>(
        &self,
        ticket: &Ticket,
        result: Result<ParseOutput, Cancelled>,
        sink: &S,
    ) -> AnalysisStatus
    where
        S: DiagnosticSink + ?Sized,
    {
        let (uri, diagnostics) = {
            let mut state = self.state.lock().await;
            if ticket.generation != state.generation {
                debug!(uri = %state.uri, version = ticket.version, "Analysis superseded, dropping result");
                return AnalysisStatus::Superseded;
            }
            state.cancel = None;

            let output = match result {
                Ok(output) => output,
                Err(Cancelled) => {
                    info!(uri = %state.uri, version = ticket.version, "Analysis cancelled");
                    state.status = AnalysisStatus::Cancelled;
                    return AnalysisStatus::Cancelled;
                }
            };

            state.tree = Some(output.tree(&ticket.schema));
            state.errors = output.errors;
            state.warnings = output.warnings;
            state.scopes = output.scopes;
            state.status = AnalysisStatus::Published;
            (state.uri.clone(), state.lsp_diagnostics())
        };

        debug!(%uri, version = ticket.version, count = diagnostics.len(), "Publishing diagnostics");
        sink.publish(uri, diagnostics, Some(ticket.version)).await;
        AnalysisStatus::Published
    }

    /// Cancel the analysis in flight, if any. Its result is dropped even if
    /// parsing already completed.
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
            state.generation += 1;
            state.status = AnalysisStatus::Cancelled;
        }
    }

    /// Hover for a protocol position, from the last published analysis.
    pub async fn hover(&self, position: lsp_types::Position) -> Option<Hover> {
        let state = self.state.lock().await;
        let scope = ScopeInfo::find(&state.scopes, from_lsp_position(&state.content, position))?;
        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: scope.hover_text.clone(),
            }),
            range: Some(to_lsp_range(&state.content, scope.range)),
        })
    }

    pub async fn content(&self) -> String {
        self.state.lock().await.content.clone()
    }

    pub async fn version(&self) -> i32 {
        self.state.lock().await.version
    }

    pub async fn status(&self) -> AnalysisStatus {
        self.state.lock().await.status
    }

    /// Attribute tree of the last analysis, if the content has not changed since.
    pub async fn tree(&self) -> Option<Attributes> {
        self.state.lock().await.tree.clone()
    }

    /// Errors and warnings of the last published analysis.
    pub async fn diagnostics(&self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        let state = self.state.lock().await;
        (state.errors.clone(), state.warnings.clone())
    }
}

/// Parse the snapshot in `ticket` on the blocking pool and hand the result
/// to [`Document::finish`].
pub async fn run_analysis<S>(document: Arc<Document>, ticket: Ticket, sink: &S) -> AnalysisStatus
where
    S: DiagnosticSink + ?Sized,
{
    let job = ticket.clone();
    let result = tokio::task::spawn_blocking(move || parse(&job.schema, &job.content, job.cancel))
        .await
        .unwrap_or_else(|e| {
            error!("Analysis task failed: {}", e);
            Err(Cancelled)
        });
    document.finish(&ticket, result, sink).await
}

/// All open documents.
#[derive(Default)]
pub struct Registry {
    documents: Mutex<HashMap<Url, Arc<Document>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened document, replacing any previous one under `uri`.
    pub async fn open(&self, uri: Url, content: String, version: i32, table: TableKind) -> Arc<Document> {
        let document = Arc::new(Document::new(uri.clone(), content, version, table));
        let previous = self
            .documents
            .lock()
            .await
            .insert(uri.clone(), Arc::clone(&document));
        if let Some(previous) = previous {
            previous.cancel().await;
        }
        info!(%uri, version, %table, "Opened document");
        document
    }

    pub async fn get(&self, uri: &Url) -> Option<Arc<Document>> {
        self.documents.lock().await.get(uri).cloned()
    }

    /// Forget `uri`, cancelling its analysis in flight.
    pub async fn close(&self, uri: &Url) -> Option<Arc<Document>> {
        let document = self.documents.lock().await.remove(uri)?;
        document.cancel().await;
        info!(%uri, "Closed document");
        Some(document)
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}
