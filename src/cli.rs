use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index new and changed library items.
    Sync {
        /// Embed extracted document text instead of metadata fields.
        #[clap(long, default_value = "false")]
        fulltext: bool,

        /// Only process items modified at or after this instant (RFC 3339).
        #[clap(long)]
        since: Option<String>,

        /// Cap on processed items.
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// Re-embed the entire library and drop removed items.
    Rebuild {
        /// Embed extracted document text instead of metadata fields.
        #[clap(long, default_value = "false")]
        fulltext: bool,
    },

    /// Search the library by meaning.
    Search {
        /// Natural-language query.
        query: String,

        /// Number of results.
        #[clap(short = 'n', long)]
        limit: Option<usize>,

        /// Only return items of this type (e.g. journalArticle).
        #[clap(short = 't', long)]
        item_type: Option<String>,

        /// Only return items carrying this tag.
        #[clap(short = 'g', long)]
        tag: Option<String>,
    },

    /// Print index and scheduler status.
    Status {},
}
