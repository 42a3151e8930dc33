//! CLI argument definitions for the Arbor binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// Indented tree for humans
    Human,
    /// Machine-readable JSON
    Json,
}

/// Inspect and edit JSON documents through a property tree
#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(about = "Arbor: property trees over JSON documents, with multi-document editing")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "human", env = "ARBOR_FORMAT")]
    pub format: Format,

    /// JSON file holding the view settings
    #[arg(long, global = true, env = "ARBOR_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the tree of one document, or the combined tree of several
    Show(ShowArgs),
    /// Write a value through the tree
    Set(SetArgs),
    /// Run a command of a node
    Invoke(InvokeArgs),
}

/// Documents presented by a command
#[derive(clap::Args, Debug)]
pub struct DocumentArgs {
    /// JSON documents; several documents are edited together
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Type name of documents without a `$type` member
    #[arg(long = "type", default_value = "Document", env = "ARBOR_TYPE")]
    pub type_name: String,
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub documents: DocumentArgs,

    /// Also print hidden nodes and commands
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for the set command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Dotted path of the node, starting at the root (e.g. `Root.camera.fov`)
    #[arg(short, long)]
    pub path: String,

    /// New value, as JSON; anything that is not valid JSON is taken as text
    #[arg(short, long)]
    pub value: String,

    /// Write the documents back to their files
    #[arg(short, long, env = "ARBOR_WRITE")]
    pub write: bool,

    #[command(flatten)]
    pub documents: DocumentArgs,
}

/// Arguments for the invoke command
#[derive(clap::Args, Debug)]
pub struct InvokeArgs {
    /// Dotted path of the node, starting at the root
    #[arg(short, long)]
    pub path: String,

    /// Name of the command
    #[arg(short, long)]
    pub command: String,

    /// Command parameter, as JSON; anything that is not valid JSON is taken as text
    #[arg(long)]
    pub parameter: Option<String>,

    /// Write the documents back to their files
    #[arg(short, long, env = "ARBOR_WRITE")]
    pub write: bool,

    #[command(flatten)]
    pub documents: DocumentArgs,
}
