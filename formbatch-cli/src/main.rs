//! formbatch - Merge completed PDF forms and archive the originals.
//!
//! Command-line front end over the formbatch library: list staged forms,
//! merge a selection, and search the tracking sheet.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, ListArgs, MergeArgs, SearchArgs};
use formbatch::api::{self, MergeSummary, Reply};
use formbatch::error::FormBatchError;
use formbatch::merge::{HttpMergeClient, MergedDocument, output_name};
use formbatch::output::{
    OutputFormatter, display_candidates, display_merge_report, display_search_results,
    format_file_size,
};
use formbatch::sheet::JsonWorkbook;
use formbatch::store::LocalFolderStore;
use formbatch::{Config, Orchestrator};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let formatter = OutputFormatter::new(cli.quiet, cli.verbose > 0);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            formatter.error(&format!("cannot start runtime: {err}"));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, &formatter)) {
        Ok(code) => code,
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Logs go to stderr so `--json` output stays clean.
fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

/// Process exit code for a failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<FormBatchError>()
        .and_then(|err| u8::try_from(err.exit_code()).ok())
        .unwrap_or(1)
}

async fn run(cli: Cli, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
    let config = cli.to_config()?;
    let orchestrator = build_orchestrator(&cli, config)?;

    match &cli.command {
        Command::List(args) => list(&orchestrator, formatter, args).await,
        Command::Merge(args) => merge(&orchestrator, formatter, args).await,
        Command::Search(args) => search(&orchestrator, formatter, args).await,
    }
}

fn build_orchestrator(cli: &Cli, config: Config) -> anyhow::Result<Orchestrator> {
    let store = LocalFolderStore::new(cli.store_root()?);
    let merger = HttpMergeClient::new(&config)?;
    tracing::debug!(
        root = %store.root().display(),
        endpoint = merger.endpoint(),
        workbook = %config.sheet_id,
        "configured"
    );

    Ok(Orchestrator::new(
        config,
        Arc::new(store),
        Arc::new(JsonWorkbook::new()),
        Arc::new(merger),
    )?)
}

/// Prints an envelope; a failed envelope exits with status 1.
fn emit<T: Serialize>(reply: &Reply<T>) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(reply)?);
    Ok(if reply.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn list(
    orchestrator: &Orchestrator,
    formatter: &OutputFormatter,
    args: &ListArgs,
) -> anyhow::Result<ExitCode> {
    if args.json {
        return emit(&api::list_new_forms(orchestrator).await);
    }

    let candidates = orchestrator.list_new_forms().await?;
    display_candidates(formatter, &candidates, orchestrator.config().offset()?);
    Ok(ExitCode::SUCCESS)
}

async fn merge(
    orchestrator: &Orchestrator,
    formatter: &OutputFormatter,
    args: &MergeArgs,
) -> anyhow::Result<ExitCode> {
    let mut ids = args.ids.clone();
    if let Some(source) = &args.ids_from {
        ids.extend(read_id_list(source).await?);
    }

    let name = output_name(orchestrator.config().now());
    let output = args.output.clone().unwrap_or_else(|| PathBuf::from(&name));
    let fallback = std::env::current_dir()?.join(&name);

    // Nothing may move until the document has somewhere to go.
    let pending = match PendingOutput::reserve(output, args.force) {
        Ok(pending) => pending,
        Err(err) if args.json => {
            return emit(&Reply::<MergeSummary>::failure(format!("{err:#}")));
        }
        Err(err) => return Err(err),
    };
    let target = pending.path().to_path_buf();
    formatter.debug(&format!("writing merged PDF to {}", target.display()));

    if args.json {
        let reply = api::get_merged_pdf_and_archive(orchestrator, &ids).await;
        let mut saved = true;
        if let Some(summary) = &reply.body {
            let document = MergedDocument::from_base64(summary.base64.clone());
            match save_document(&document, pending, &fallback, formatter) {
                Ok(Saved::Output(_)) => {}
                Ok(Saved::Fallback(path)) => {
                    formatter.warning(&format!("merged PDF saved to {} instead", path.display()));
                    saved = false;
                }
                Err(err) => {
                    formatter.error(&format!(
                        "cannot save merged PDF ({err:#}); the envelope carries it as base64"
                    ));
                    saved = false;
                }
            }
        }
        let code = emit(&reply)?;
        return Ok(if saved { code } else { ExitCode::FAILURE });
    }

    formatter.info(&format!("Merging {} selected file(s)...", ids.len()));
    let report = orchestrator.merge_and_archive(&ids).await?;
    display_merge_report(formatter, &report);

    match save_document(&report.document, pending, &fallback, formatter) {
        Ok(Saved::Output(size)) => {
            formatter.success(&format!(
                "Wrote {} ({})",
                target.display(),
                format_file_size(size)
            ));
            Ok(ExitCode::SUCCESS)
        }
        Ok(Saved::Fallback(path)) => {
            formatter.warning(&format!("Merged PDF saved to {} instead", path.display()));
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            formatter.error(&format!("cannot save merged PDF: {err:#}"));
            formatter.warning("Files are archived; printing the merged PDF as base64");
            println!("{}", report.document.as_base64());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn search(
    orchestrator: &Orchestrator,
    formatter: &OutputFormatter,
    args: &SearchArgs,
) -> anyhow::Result<ExitCode> {
    let query = args.to_query();
    if args.json {
        return emit(&api::search_forms_for_recreate(orchestrator, &query).await);
    }

    let rows = orchestrator.search(&query).await?;
    display_search_results(formatter, &rows);
    Ok(ExitCode::SUCCESS)
}

/// Where the merged PDF ends up.
#[derive(Debug)]
enum Saved {
    /// Written to the requested output; carries the size in bytes.
    Output(u64),
    /// The output could not be written; the document went here instead.
    Fallback(PathBuf),
}

/// Output file reserved before the merge runs.
///
/// Holds a temporary file in the destination directory, so a directory that
/// is missing or read-only fails the command before any file is archived.
#[derive(Debug)]
struct PendingOutput {
    path: PathBuf,
    file: NamedTempFile,
    force: bool,
}

impl PendingOutput {
    /// Refuses to clobber an existing file unless forced.
    fn reserve(path: PathBuf, force: bool) -> anyhow::Result<Self> {
        if path.exists() && !force {
            bail!(
                "output file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot write to {}", dir.display()))?;
        Ok(Self { path, file, force })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `bytes` and moves the temporary file into place.
    fn commit(mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let path = self.path.clone();
        let context = || format!("cannot write {}", path.display());

        self.file.write_all(bytes).with_context(context)?;
        self.file.as_file().sync_all().with_context(context)?;
        let persisted = if self.force {
            self.file.persist(&self.path)
        } else {
            self.file.persist_noclobber(&self.path)
        };
        persisted.map_err(|err| err.error).with_context(context)?;
        Ok(())
    }
}

/// Decodes the document into the reserved output, or into `fallback` when
/// the output cannot be written any more.
fn save_document(
    document: &MergedDocument,
    pending: PendingOutput,
    fallback: &Path,
    formatter: &OutputFormatter,
) -> anyhow::Result<Saved> {
    let bytes = document.decode()?;
    match pending.commit(&bytes) {
        Ok(()) => Ok(Saved::Output(bytes.len() as u64)),
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(fallback)
                .with_context(|| format!("cannot write {}", fallback.display()))?;
            file.write_all(&bytes)
                .with_context(|| format!("cannot write {}", fallback.display()))?;
            Ok(Saved::Fallback(fallback.to_path_buf()))
        }
    }
}

/// Reads a JSON array of identifiers from a file, or stdin for `-`.
async fn read_id_list(source: &Path) -> anyhow::Result<Vec<String>> {
    let raw = if source == Path::new("-") {
        let mut raw = Vec::new();
        tokio::io::stdin().read_to_end(&mut raw).await?;
        raw
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("cannot read {}", source.display()))?
    };

    let value: serde_json::Value = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not JSON", source.display()))?;
    Ok(api::file_ids_from_json(&value)?)
}
