use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kvstream_sdk::DigestAlgorithm;

#[derive(Parser)]
#[command(
    name = "kvstream",
    about = "Stream files through a key-value store with atomic, content-addressed commits",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with default window size, ceiling, ttl and digest
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Stream a file through an in-process store and report the commit.
    /// The store lives only for this command, so nothing is persisted.
    Put(PutArgs),
    /// Stream a file into the store, then stream it back out to another file
    Copy(CopyArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct WriteArgs {
    /// Commit key; defaults to the digest when --digest is given
    #[arg(short, long)]
    pub key: Option<String>,
    /// Digest algorithm (sha1, sha256, sha384, sha512, blake3)
    #[arg(short, long)]
    pub digest: Option<DigestAlgorithm>,
    /// Fail once the stored value grows past this many bytes
    #[arg(long)]
    pub max_bytes: Option<u64>,
    /// Expire the committed key after this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub ttl: Option<u64>,
    /// Bytes per read and per append
    #[arg(long)]
    pub window_size: Option<usize>,
}

#[derive(Args)]
pub struct PutArgs {
    pub path: PathBuf,
    #[command(flatten)]
    pub write: WriteArgs,
}

#[derive(Args)]
pub struct CopyArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[command(flatten)]
    pub write: WriteArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_is_rejected() {
        let err = Cli::try_parse_from(["kvstream", "put", "f", "--key", "k", "--ttl", "0"]);
        assert!(err.is_err());
    }

    #[test]
    fn write_flags_parse() {
        let cli = Cli::try_parse_from([
            "kvstream", "put", "f", "--digest", "sha1", "--ttl", "30", "--max-bytes", "10",
        ])
        .unwrap();
        let Command::Put(args) = cli.command else {
            panic!("expected put");
        };
        assert_eq!(args.write.digest, Some(DigestAlgorithm::Sha1));
        assert_eq!(args.write.ttl, Some(30));
        assert_eq!(args.write.max_bytes, Some(10));
    }
}
