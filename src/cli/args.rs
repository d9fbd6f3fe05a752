use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eopr", version, about = "EOPR CLI")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Schema file (JSON); the built-in MERIS-style schema is used when absent
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Enable logging
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Dump the MPH and SPH fields of a product
    Header {
        /// Input product file
        input: PathBuf,
    },

    /// Export one band as a raw sample image
    Band {
        /// Input product file
        input: PathBuf,

        /// Band name (as defined by the schema)
        band: String,

        /// Output raw image file
        output: PathBuf,
    },

    /// Evaluate a bitmask expression and export the mask as a raw byte image
    Bitmask {
        /// Input product file
        input: PathBuf,

        /// Bitmask expression, e.g. "l2_flags.LAND and !l2_flags.BRIGHT"
        expression: String,

        /// Output raw image file
        output: PathBuf,
    },

    /// Swap the endian order of raw sample files in place
    SwapEndian {
        /// Element size in bytes (2, 4 or 8)
        #[arg(long)]
        width: usize,

        /// Files to rewrite
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}
