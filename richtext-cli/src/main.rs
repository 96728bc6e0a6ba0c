//! # richtext CLI
//!
//! Convert and annotate rich-text documents stored as JSON snapshots.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use doc_model::AnnotationKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "richtext")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding settings.json
    #[arg(long, env = "RICHTEXT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document snapshot as static HTML
    ToHtml {
        /// Snapshot file
        input: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import an HTML fragment as a document snapshot
    FromHtml {
        /// HTML file
        input: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply, update or remove an annotation on the first occurrence of some text
    Annotate {
        /// Snapshot file
        input: PathBuf,

        /// Annotation type (abbr or langTag)
        #[arg(long, value_parser = parse_kind)]
        kind: AnnotationKind,

        /// Text to annotate
        #[arg(long)]
        find: String,

        /// Field value (title or language code); omit to remove the annotation
        #[arg(long)]
        value: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a snapshot's structure and annotation fields
    Validate {
        /// Snapshot file
        input: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn parse_kind(value: &str) -> std::result::Result<AnnotationKind, String> {
    AnnotationKind::from_type_tag(value).ok_or_else(|| {
        let known: Vec<&str> = AnnotationKind::ALL.iter().map(|k| k.type_tag()).collect();
        format!("unknown annotation type '{}', expected one of: {}", value, known.join(", "))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::WARN.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::ToHtml { input, output } => commands::to_html(&input, output.as_deref()),
        Commands::FromHtml { input, output } => commands::from_html(&input, output.as_deref()),
        Commands::Annotate {
            input,
            kind,
            find,
            value,
            output,
        } => {
            let settings = commands::load_settings(cli.config_dir.as_deref())?;
            let opts = commands::AnnotateOptions { kind, find, value };
            commands::annotate(&input, output.as_deref(), &settings, opts)
        }
        Commands::Validate { input, json } => commands::validate(&input, json),
    }
}
