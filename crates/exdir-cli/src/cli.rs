use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "exdir",
    about = "Inspect and create exdir directory stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with `mode`, `naming_rule`, and `allow_remove`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print every object in a file
    Tree(TreeArgs),
    /// Describe one object
    Show(ShowArgs),
    /// Print the attributes of an object
    Attrs(AttrsArgs),
    /// Print the contents of a dataset
    Cat(CatArgs),
    /// Create a new file
    Init(InitArgs),
}

#[derive(Args)]
pub struct TreeArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    pub file: PathBuf,
    pub object: String,
}

#[derive(Args)]
pub struct AttrsArgs {
    pub file: PathBuf,
    /// Object path; the root when omitted
    pub object: Option<String>,
    /// Show the `exdir.yaml` record instead
    #[arg(long)]
    pub meta: bool,
}

#[derive(Args)]
pub struct CatArgs {
    pub file: PathBuf,
    pub dataset: String,
    /// Print only this index along the first axis (negative counts from the end)
    #[arg(short, long, allow_hyphen_values = true)]
    pub index: Option<isize>,
}

#[derive(Args)]
pub struct InitArgs {
    pub file: PathBuf,
    /// Replace an existing file
    #[arg(short, long)]
    pub force: bool,
}
