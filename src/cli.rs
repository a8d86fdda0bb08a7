use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "navhoard",
    version,
    about = "Browser bookmark import and deduplication for the navigation dataset"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import bookmark exports into the canonical dataset.
    Import(ImportArgs),
    /// Check canonical dataset invariants.
    Validate(ValidateArgs),
    /// Report dataset counts and the latest import run.
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FormatArg {
    /// Detect per file from the leading bytes.
    Auto,
    /// Chrome/Firefox NETSCAPE-Bookmark-file-1 HTML export.
    Netscape,
    /// Safari property-list export, binary or XML.
    SafariPlist,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Bookmark export files to import, processed in argument order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Canonical dataset read at run start.
    #[arg(long)]
    pub data: PathBuf,

    /// Where to write the updated dataset; defaults to --data.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    pub format: FormatArg,

    /// Taxonomy for entries with no folder path.
    #[arg(long, default_value = "Uncategorized")]
    pub default_taxonomy: String,

    /// Run-manifest path; defaults to manifests/ next to the output file.
    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Run the full pipeline but skip the final dataset write.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long)]
    pub data: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub data: PathBuf,
}
