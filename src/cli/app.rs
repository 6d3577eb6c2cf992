use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "inno-query")]
#[command(about = "Query InnoDB tablespace files without a MySQL server")]
#[command(version)]
pub struct Cli {
    /// Reader configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show page count, clustered index root and fill statistics
    Info {
        /// Path to InnoDB data file (.ibd)
        #[arg(short, long)]
        file: String,

        /// Table definition (JSON)
        #[arg(short, long)]
        schema: String,
    },

    /// Decode one page and print its structure as JSON
    Page {
        /// Path to InnoDB data file (.ibd)
        #[arg(short, long)]
        file: String,

        /// Page number
        #[arg(short, long)]
        page: u32,
    },

    /// Look up one row by primary key
    Get {
        /// Path to InnoDB data file (.ibd)
        #[arg(short, long)]
        file: String,

        /// Table definition (JSON)
        #[arg(short, long)]
        schema: String,

        /// Primary key values, comma separated in key order
        #[arg(short, long)]
        key: String,
    },

    /// Scan every row, optionally filtered and projected
    Scan {
        /// Path to InnoDB data file (.ibd)
        #[arg(short, long)]
        file: String,

        /// Table definition (JSON)
        #[arg(short, long)]
        schema: String,

        /// Keep rows where COLUMN equals VALUE (repeatable)
        #[arg(short = 'w', long = "where", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,

        /// Columns to print, comma separated
        #[arg(long)]
        columns: Option<String>,
    },

    /// Scan a primary key range [FROM, TO)
    Range {
        /// Path to InnoDB data file (.ibd)
        #[arg(short, long)]
        file: String,

        /// Table definition (JSON)
        #[arg(short, long)]
        schema: String,

        /// Inclusive lower bound, comma separated key prefix
        #[arg(long)]
        from: Option<String>,

        /// Exclusive upper bound, comma separated key prefix
        #[arg(long)]
        to: Option<String>,

        /// Columns to print, comma separated
        #[arg(long)]
        columns: Option<String>,
    },
}
