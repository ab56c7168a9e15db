use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stash_core::{EntryKind, OutOfRangePolicy, SortOrder};

#[derive(Parser)]
#[command(
    name = "stash",
    about = "Stash: queue tensor triplets between pipeline stages and pick inputs by index",
    version
)]
pub struct Cli {
    /// Path to stash.toml (defaults to ./stash.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append one triplet to a disk queue
    Save {
        /// Queue name (blank = configured default)
        #[arg(long, default_value = "")]
        queue: String,

        /// File holding the primary component
        #[arg(long)]
        primary: PathBuf,

        /// File holding the positive conditioning component
        #[arg(long)]
        positive: PathBuf,

        /// File holding the negative conditioning component
        #[arg(long)]
        negative: PathBuf,
    },

    /// Read the next triplet from a disk queue
    Load {
        #[arg(long, default_value = "")]
        queue: String,

        /// Advance the cursor instead of deleting the item
        #[arg(long)]
        peek: bool,

        /// Start from the first item
        #[arg(long)]
        reset_cursor: bool,

        /// Start position for this call only (-1 = stored cursor)
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        cursor: i64,

        /// Directory the three components are written to
        #[arg(long)]
        out: PathBuf,
    },

    /// Pick one entry of a directory by index
    Resolve {
        #[arg(long)]
        root: PathBuf,

        /// dirs or files
        #[arg(long, default_value = "dirs")]
        kind: EntryKind,

        /// natural, name, name_desc, mtime or mtime_desc
        #[arg(long, default_value = "natural")]
        sort: SortOrder,

        #[arg(long)]
        include: Option<String>,

        #[arg(long)]
        exclude: Option<String>,

        /// Comma-separated extension allow-list (files only)
        #[arg(long, default_value = "")]
        ext: String,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        index: i64,

        /// wrap, clamp or error
        #[arg(long, default_value = "wrap")]
        on_out_of_range: OutOfRangePolicy,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show unread items of a disk queue
    Describe {
        #[arg(long, default_value = "")]
        queue: String,
    },

    /// Answer a preview request read as JSON from stdin
    Preview,

    /// Remove empty disk queue directories
    Prune,
}
