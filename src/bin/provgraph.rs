//! provgraph CLI: encode subject directories, tables and stats reports.
//!
//! Usage:
//!   provgraph directory --subject-dir <dir> --project-id <id> [--output-dir <dir>]
//!   provgraph table <file.csv> [--rows N] [--output <file>]
//!   provgraph stats <file.stats> [--output <file>] [--vocabulary <file>]

use clap::{Parser, Subcommand, ValueEnum};
use provgraph::export::{provn, triples};
use provgraph::{EncoderConfig, GraphOrchestrator, IdentifierMode, ProvenanceGraph};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "provgraph",
    version,
    about = "Encode neuroimaging file collections as provenance graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Provn)]
    format: Format,
    /// Named graph for `sparql-update` output
    #[arg(long, global = true)]
    graph_iri: Option<String>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a FreeSurfer subject directory
    Directory {
        /// Subject directory; its name is the subject id
        #[arg(long)]
        subject_dir: PathBuf,
        /// Project the subject belongs to
        #[arg(long)]
        project_id: String,
        /// Where `<subject>_<project>.<ext>` is written
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Hostname recorded in file URLs
        #[arg(long)]
        hostname: Option<String>,
        /// Stop after this many files
        #[arg(long)]
        max_items: Option<usize>,
        /// Derive identifiers from content so reruns reproduce them
        #[arg(long)]
        deterministic: bool,
    },
    /// Encode a delimited table
    Table {
        path: PathBuf,
        /// Encode at most this many rows
        #[arg(long)]
        rows: Option<usize>,
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Encode a FreeSurfer stats report
    Stats {
        path: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also write the measure vocabulary as N-Triples
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Provn,
    Ntriples,
    Json,
    SparqlUpdate,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Provn => "provn",
            Format::Ntriples => "nt",
            Format::Json => "json",
            Format::SparqlUpdate => "ru",
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn render(graph: &ProvenanceGraph, format: Format, graph_iri: Option<&str>) -> Result<String, String> {
    match format {
        Format::Provn => Ok(provn::render(graph)),
        Format::Json => serde_json::to_string_pretty(graph).map_err(|e| e.to_string()),
        Format::Ntriples => {
            let lines = triples::statements(graph).map_err(|e| e.to_string())?;
            Ok(lines.into_iter().map(|l| l + "\n").collect())
        }
        Format::SparqlUpdate => {
            let iri = graph_iri.ok_or("--graph-iri is required for sparql-update output")?;
            let lines = triples::statements(graph).map_err(|e| e.to_string())?;
            let batches = triples::batches(&lines, triples::MAX_STATEMENTS_PER_REQUEST)
                .map_err(|e| e.to_string())?;
            Ok(batches
                .into_iter()
                .map(|batch| triples::insert_body(iri, batch))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

fn write_output(text: &str, output: Option<&Path>) -> Result<(), String> {
    match output {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e)),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

struct OutputOptions<'a> {
    format: Format,
    graph_iri: Option<&'a str>,
}

#[allow(clippy::too_many_arguments)]
fn cmd_directory(
    mut config: EncoderConfig,
    out: &OutputOptions,
    subject_dir: &Path,
    project_id: &str,
    output_dir: &Path,
    hostname: Option<String>,
    max_items: Option<usize>,
    deterministic: bool,
) -> i32 {
    if hostname.is_some() {
        config.hostname = hostname;
    }
    if let Some(max) = max_items {
        config.max_items = max;
    }
    if deterministic {
        config.identifiers = IdentifierMode::Content;
    }

    let outcome = match GraphOrchestrator::new(config).encode_directory(subject_dir, project_id) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let subject = outcome
        .encoding
        .root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = output_dir.join(format!("{}_{}.{}", subject, project_id, out.format.extension()));
    let result = render(&outcome.graph, out.format, out.graph_iri)
        .and_then(|text| write_output(&text, Some(&path)));
    match result {
        Ok(()) => {
            let summary = outcome.encoding.summary;
            println!(
                "Encoded {} files from '{}' ({} ignored, {} failed{}) → {}",
                summary.encoded,
                subject,
                summary.skipped_ignored,
                summary.failed,
                if summary.capped { ", capped" } else { "" },
                path.display()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_table(
    mut config: EncoderConfig,
    out: &OutputOptions,
    path: &Path,
    rows: Option<usize>,
    output: Option<&Path>,
) -> i32 {
    if rows.is_some() {
        config.table.max_rows = rows;
    }
    let outcome = match GraphOrchestrator::new(config).encode_table(path) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match render(&outcome.graph, out.format, out.graph_iri).and_then(|t| write_output(&t, output)) {
        Ok(()) => {
            eprintln!(
                "Encoded {} rows, {} columns from {}",
                outcome.encoding.rows.len(),
                outcome.encoding.columns.len(),
                path.display()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_stats(
    config: EncoderConfig,
    out: &OutputOptions,
    path: &Path,
    output: Option<&Path>,
    vocabulary: Option<&Path>,
) -> i32 {
    let namespaces = config.namespace_table();
    let outcome = match GraphOrchestrator::new(config).encode_stats(path) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if let Some(vocab_path) = vocabulary {
        let written = triples::vocabulary_statements(&namespaces, &outcome.encoding.vocabulary)
            .map_err(|e| e.to_string())
            .and_then(|lines| {
                let text: String = lines.into_iter().map(|l| l + "\n").collect();
                write_output(&text, Some(vocab_path))
            });
        if let Err(e) = written {
            eprintln!("Error: {}", e);
            return 1;
        }
    }

    match render(&outcome.graph, out.format, out.graph_iri).and_then(|t| write_output(&t, output)) {
        Ok(()) => {
            eprintln!(
                "Encoded {} structures, {} measures from {}",
                outcome.encoding.structures.len(),
                outcome.encoding.vocabulary.len(),
                path.display()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match EncoderConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let out = OutputOptions {
        format: cli.format,
        graph_iri: cli.graph_iri.as_deref(),
    };
    if out.format == Format::SparqlUpdate && out.graph_iri.is_none() {
        eprintln!("Error: --graph-iri is required for sparql-update output");
        std::process::exit(2);
    }

    let code = match cli.command {
        Commands::Directory {
            subject_dir,
            project_id,
            output_dir,
            hostname,
            max_items,
            deterministic,
        } => cmd_directory(
            config,
            &out,
            &subject_dir,
            &project_id,
            &output_dir,
            hostname,
            max_items,
            deterministic,
        ),
        Commands::Table { path, rows, output } => {
            cmd_table(config, &out, &path, rows, output.as_deref())
        }
        Commands::Stats {
            path,
            output,
            vocabulary,
        } => cmd_stats(config, &out, &path, output.as_deref(), vocabulary.as_deref()),
    };
    std::process::exit(code);
}
