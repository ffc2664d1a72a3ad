//! Sketch Language Server — diagnostics, completions, hover, document
//! symbols, formatting.
//!
//! A `tower-lsp` based LSP server that wraps `sketch-core` for real-time
//! editor feedback. With a subcommand it runs once instead: `check`,
//! `format`, `compile`, and `decompile` read a file (or stdin) and write
//! to stdout.

mod completion;
mod diagnostics;
mod hover;
mod symbols;
mod text;

use clap::{Args, Parser, Subcommand};
use sketch_core::ast::ErrorLocation;
use sketch_core::compile::{CompileError, CompileOptions, compile};
use sketch_core::decompile::{DecompileOptions, decompile_with};
use sketch_core::format::format_document;
use sketch_core::layout::{Algorithm, Direction};
use sketch_core::lint::{LintSeverity, lint_document};
use sketch_core::parser::parse_document;
use sketch_core::shape::Shape;
use sketch_core::{Document, ParseError};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

// ─── Language server ─────────────────────────────────────────────────────

/// Cached parse state for a single document.
struct DocumentState {
    text: String,
    /// Last document that parsed without errors.
    last_good: Option<Document>,
}

/// The Sketch language server backend.
struct SketchLanguageServer {
    client: Client,
    /// Cached document state by URI.
    documents: Mutex<HashMap<Url, DocumentState>>,
    /// Layout used for hover previews, from `initializationOptions`.
    options: Mutex<CompileOptions>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SketchLanguageServer {
    fn new(client: Client) -> Self {
        Self {
            client,
            documents: Mutex::new(HashMap::new()),
            options: Mutex::new(CompileOptions::default()),
        }
    }

    /// Reparse a document and publish diagnostics.
    async fn on_change(&self, uri: Url, text: String) {
        let diags = diagnostics::compute_diagnostics(&text);
        let doc = parse_document(&text);

        {
            let mut docs = lock(&self.documents);
            let previous = docs.remove(&uri).and_then(|state| state.last_good);
            let last_good = if doc.is_ok() { Some(doc) } else { previous };
            docs.insert(uri.clone(), DocumentState { text, last_good });
        }

        self.client.publish_diagnostics(uri, diags, None).await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for SketchLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(value) = params.initialization_options {
            match serde_json::from_value::<CompileOptions>(value) {
                Ok(options) => *lock(&self.options) = options,
                Err(err) => log::warn!("ignoring initializationOptions: {err}"),
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        ":".to_string(),
                        "(".to_string(),
                        ",".to_string(),
                        "@".to_string(),
                    ]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "sketch-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "sketch-lsp initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        self.on_change(uri, text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().next_back() {
            self.on_change(uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        lock(&self.documents).remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let docs = lock(&self.documents);
        let items = docs
            .get(uri)
            .map(|doc| completion::compute_completions(&doc.text, pos))
            .unwrap_or_default();

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let options = lock(&self.options).clone();
        let docs = lock(&self.documents);
        Ok(docs.get(uri).and_then(|doc| {
            hover::compute_hover(&doc.text, pos, doc.last_good.as_ref(), &options)
        }))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = &params.text_document.uri;

        let docs = lock(&self.documents);
        let symbols = docs
            .get(uri)
            .map(|doc| symbols::compute_symbols(&doc.text))
            .unwrap_or_default();
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = &params.text_document.uri;

        let docs = lock(&self.documents);
        let Some(doc) = docs.get(uri) else {
            return Ok(None);
        };
        match format_document(&doc.text) {
            Ok(formatted) if formatted == doc.text => Ok(Some(Vec::new())),
            Ok(formatted) => Ok(Some(vec![TextEdit {
                range: text::SourceMap::new(&doc.text).full_range(),
                new_text: formatted,
            }])),
            Err(errors) => {
                log::debug!("not formatting {uri}: {} syntax errors", errors.len());
                Ok(None)
            }
        }
    }
}

// ─── Command line ────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("{path}: {count} syntax error(s)")]
    Syntax { path: String, count: usize },
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("invalid shape JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "sketch-lsp",
    version,
    about = "Sketch language server; runs once when given a subcommand"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print syntax errors and lint findings; fails on syntax errors.
    Check { file: Option<PathBuf> },
    /// Print the canonical formatting of a document.
    Format { file: Option<PathBuf> },
    /// Compile a document to a JSON shape list.
    Compile {
        file: Option<PathBuf>,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Turn a JSON shape list back into Sketch text.
    Decompile {
        file: Option<PathBuf>,
        /// Emit `x`/`y` so the text recompiles at the same positions.
        #[arg(long, env = "SKETCH_POSITIONS")]
        positions: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct LayoutArgs {
    /// Algorithm used unless the document has an `@layout` directive.
    #[arg(long, env = "SKETCH_ALGORITHM", default_value_t = Algorithm::Layered)]
    algorithm: Algorithm,
    #[arg(long, env = "SKETCH_DIRECTION", default_value_t = Direction::Down)]
    direction: Direction,
    #[arg(long, env = "SKETCH_NODE_SPACING", default_value_t = 50.0)]
    node_spacing: f64,
    #[arg(long, env = "SKETCH_EDGE_SPACING", default_value_t = 20.0)]
    edge_spacing: f64,
}

impl From<LayoutArgs> for CompileOptions {
    fn from(args: LayoutArgs) -> Self {
        Self {
            algorithm: args.algorithm,
            direction: args.direction,
            node_spacing: args.node_spacing,
            edge_spacing: args.edge_spacing,
        }
    }
}

fn display_name(file: Option<&PathBuf>) -> String {
    file.map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string())
}

fn read_input(file: Option<&PathBuf>) -> std::result::Result<String, CliError> {
    let read = match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    read.map_err(|source| CliError::Read {
        path: display_name(file),
        source,
    })
}

fn location(loc: Option<ErrorLocation>) -> String {
    loc.map_or_else(
        || "1:1".to_string(),
        |l| format!("{}:{}", l.start_line, l.start_column),
    )
}

fn syntax_report(path: &str, errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| format!("{path}:{}: error: {}\n", location(e.location), e.message))
        .collect()
}

/// Diagnostics as `path:line:col: severity: message` lines, plus the
/// number of syntax errors among them.
fn check_report(path: &str, text: &str) -> (String, usize) {
    let doc = parse_document(text);
    let mut report = syntax_report(path, &doc.errors);
    for lint in lint_document(text) {
        let severity = match lint.severity {
            LintSeverity::Warning => "warning",
            LintSeverity::Info => "info",
        };
        report.push_str(&format!(
            "{path}:{}: {severity}[{}]: {}\n",
            lint.span.start_pos, lint.rule, lint.message
        ));
    }
    (report, doc.errors.len())
}

fn compile_json(
    path: &str,
    text: &str,
    options: &CompileOptions,
) -> std::result::Result<String, CliError> {
    let doc = parse_document(text);
    if !doc.is_ok() {
        eprint!("{}", syntax_report(path, &doc.errors));
        return Err(CliError::Syntax {
            path: path.to_string(),
            count: doc.errors.len(),
        });
    }
    let shapes = compile(&doc, options)?;
    Ok(serde_json::to_string_pretty(&shapes)?)
}

fn decompile_json(json: &str, positions: bool) -> std::result::Result<String, CliError> {
    let shapes: Vec<Shape> = serde_json::from_str(json)?;
    Ok(decompile_with(
        &shapes,
        &DecompileOptions {
            include_positions: positions,
        },
    ))
}

fn run(command: Command) -> std::result::Result<(), CliError> {
    match command {
        Command::Check { file } => {
            let path = display_name(file.as_ref());
            let (report, errors) = check_report(&path, &read_input(file.as_ref())?);
            print!("{report}");
            if errors > 0 {
                return Err(CliError::Syntax {
                    path,
                    count: errors,
                });
            }
        }
        Command::Format { file } => {
            let path = display_name(file.as_ref());
            match format_document(&read_input(file.as_ref())?) {
                Ok(formatted) => print!("{formatted}"),
                Err(errors) => {
                    eprint!("{}", syntax_report(&path, &errors));
                    return Err(CliError::Syntax {
                        path,
                        count: errors.len(),
                    });
                }
            }
        }
        Command::Compile { file, layout } => {
            let path = display_name(file.as_ref());
            let text = read_input(file.as_ref())?;
            println!("{}", compile_json(&path, &text, &layout.into())?);
        }
        Command::Decompile { file, positions } => {
            print!("{}", decompile_json(&read_input(file.as_ref())?, positions)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Stdout belongs to the protocol or the command output.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if let Some(command) = cli.command {
        return match run(command) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("sketch-lsp: {err}");
                ExitCode::FAILURE
            }
        };
    }

    // ── Standard LSP server mode ─────────────────────────────────────────
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(SketchLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
    ExitCode::SUCCESS
}
