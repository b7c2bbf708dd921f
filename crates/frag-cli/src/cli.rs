use std::path::PathBuf;

use clap::Parser;

/// Aggregates many small files into size-controlled compressed chunks.
///
/// Every option can also be set through the environment variable named next
/// to it; an explicit flag always wins over the environment.
#[derive(Parser)]
#[command(name = "frag", version, about)]
pub struct Cli {
    /// Maximum size of each chunk (eg. 1000, 1kb, 2MB)
    #[arg(short = 'c', long, env = "CHUNK_SIZE", default_value = "10mb")]
    pub chunk: String,

    /// Join aggregated text objects with CRLF instead of LF
    #[arg(long, env = "CRLF")]
    pub crlf: bool,

    /// Driver used to read and write objects
    #[arg(short, long, env = "DRIVER", value_enum, default_value = "fs")]
    pub driver: Driver,

    /// Delete the source files once their chunk is written
    #[arg(long, env = "DELETE_SRC")]
    pub delete_src: bool,

    /// Allow chunks smaller than the size given by --chunk
    #[arg(long, env = "NO_STRICT_SIZE")]
    pub no_strict_size: bool,

    /// File to write the results to (JSON)
    #[arg(short, long, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Group chunks by their first N directory prefixes
    #[arg(long, env = "KEEP_PREFIXES", default_value_t = 0)]
    pub keep_prefixes: usize,

    /// Source to read files from (fs: directory, s3: bucket)
    #[arg(short, long, env = "SRC")]
    pub src: String,

    /// Destination to write chunks to (fs: directory, s3: bucket)
    #[arg(short = 't', long, env = "DST")]
    pub dst: String,

    /// Prefix matched against source object names
    #[arg(long, env = "SRC_PREFIX", default_value = "")]
    pub src_prefix: String,

    /// Prefix prepended to destination object names
    #[arg(long, env = "DST_PREFIX", default_value = "")]
    pub dst_prefix: String,

    /// Fraction of --chunk within which a file is considered already fine
    /// and left untouched (0.05 = within 5%)
    #[arg(long, env = "THRESHOLD", default_value_t = 0.0)]
    pub threshold: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Driver {
    /// Local directories
    Fs,
    /// S3-compatible object stores (configured via S3_* variables)
    S3,
}
