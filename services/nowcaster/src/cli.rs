//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "nowcaster")]
#[command(about = "Compute the geomagnetic aurora nowcast and write the status document")]
pub struct Args {
    /// YAML configuration (source, pipeline settings, station registry)
    #[arg(short, long, env = "NOWCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where to write the status document
    #[arg(short, long, env = "NOWCAST_OUTPUT", default_value = "docs/status.json")]
    pub output: PathBuf,

    /// Read partitions from a local directory instead of the bucket
    #[arg(long, env = "GEOMAG_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Archive bucket
    #[arg(long, env = "GEOMAG_BUCKET")]
    pub bucket: Option<String>,

    /// S3-compatible endpoint for mirrors of the archive
    #[arg(long, env = "GEOMAG_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region of the bucket
    #[arg(long = "aws-region", env = "GEOMAG_REGION")]
    pub aws_region: Option<String>,

    /// Key prefix in front of `{station}/{YYYY}/{MM}/{DD}`
    #[arg(long, env = "GEOMAG_PREFIX")]
    pub prefix: Option<String>,

    /// Only classify this region
    #[arg(short, long)]
    pub region: Option<String>,

    /// Write Prometheus metrics in textfile format here after the run
    #[arg(long, env = "NOWCAST_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    pub log_format: LogFormat,

    /// Do not print the per-region summary
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}
