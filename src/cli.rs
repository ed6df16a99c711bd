//! CLI argument parsing for bytesift

use std::path::PathBuf;

use clap::Parser;

use crate::features::NgramMode;

#[derive(Parser, Debug)]
#[command(name = "bytesift")]
#[command(version)]
#[command(
    about = "Statistical content-type classification of files and raw byte streams",
    long_about = None
)]
pub struct Cli {
    /// Files to classify ("-" reads standard input)
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Classify every BYTES-sized block instead of whole inputs
    #[arg(short = 'b', long = "block-size", value_name = "BYTES", value_parser = parse_block_size)]
    pub block_size: Option<usize>,

    /// Class file adding type names after the built-in ones
    #[arg(short = 'C', long = "class-file", value_name = "FILE")]
    pub class_file: Option<PathBuf>,

    /// Load the feature mask from FILE
    #[arg(short = 'f', long = "mask", value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Write the active (or reduced) feature mask to FILE
    #[arg(short = 'F', long = "write-mask", value_name = "FILE")]
    pub write_mask: Option<PathBuf>,

    /// Dump features as JSON labelled CLASS instead of classifying
    #[arg(short = 'j', long = "json", value_name = "CLASS", conflicts_with = "train")]
    pub json: Option<String>,

    /// Dump liblinear training lines labelled CLASS instead of classifying
    #[arg(short = 't', long = "train", value_name = "CLASS")]
    pub train: Option<String>,

    /// Model file (default: config, then $BYTESIFT_MODEL, then ./model)
    #[arg(short = 'm', long = "model", value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Ngram mode bitmask, decimal or 0x-prefixed hex
    #[arg(short = 'n', long = "ngram-mode", value_name = "MODE", value_parser = parse_ngram_mode)]
    pub ngram_mode: Option<NgramMode>,

    /// Reduce the mask to the top N features per class (requires -F)
    #[arg(short = 'R', long = "reduce", value_name = "N")]
    pub reduce: Option<usize>,

    /// Skip the first block of every input
    #[arg(short = 'x', long = "omit-first-block")]
    pub omit_first_block: bool,

    /// Report runs of same-typed blocks to stderr
    #[arg(short = 'P', long = "report-ranges")]
    pub report_ranges: bool,

    /// Look up a type: a code, a name, or "-" to list every type
    #[arg(short = 'T', long = "type", value_name = "TYPE")]
    pub type_query: Option<String>,

    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

/// What a `-T` argument asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeQuery {
    List,
    Code(i32),
    Name(String),
}

impl TypeQuery {
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            return TypeQuery::List;
        }
        if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(code) = arg.parse() {
                return TypeQuery::Code(code);
            }
        }
        TypeQuery::Name(arg.to_string())
    }
}

/// The one thing an invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LookupType(TypeQuery),
    ReduceFeatures { top_n: usize, output: PathBuf },
    Classify,
}

impl Cli {
    /// Check flag combinations and pick the command
    pub fn command(&self) -> Result<Command, String> {
        if let Some(arg) = &self.type_query {
            return Ok(Command::LookupType(TypeQuery::parse(arg)));
        }
        if let Some(top_n) = self.reduce {
            let output = self
                .write_mask
                .clone()
                .ok_or_else(|| "-R requires -F to name the reduced mask file".to_string())?;
            return Ok(Command::ReduceFeatures { top_n, output });
        }
        if self.inputs.is_empty() {
            return Err("no inputs given (use - for standard input)".to_string());
        }
        Ok(Command::Classify)
    }

    /// Class label for dump mode, if one was requested
    pub fn dump_class(&self) -> Option<&str> {
        self.json.as_deref().or(self.train.as_deref())
    }
}

fn parse_ngram_mode(arg: &str) -> Result<NgramMode, String> {
    arg.parse()
}

fn parse_block_size(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(0) => Err("block size must be > 0".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid block size '{}': {}", arg, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_inputs() {
        let cli = Cli::parse_from(["bytesift", "a.bin", "-"]);
        assert_eq!(cli.inputs, vec!["a.bin", "-"]);
        assert_eq!(cli.command().unwrap(), Command::Classify);
    }

    #[test]
    fn test_cli_requires_inputs_to_classify() {
        let cli = Cli::parse_from(["bytesift"]);
        assert!(cli.command().is_err());
    }

    #[test]
    fn test_cli_block_mode() {
        let cli = Cli::parse_from(["bytesift", "-b", "4096", "-x", "disk.img"]);
        assert_eq!(cli.block_size, Some(4096));
        assert!(cli.omit_first_block);
    }

    #[test]
    fn test_cli_block_size_zero_rejected() {
        assert!(Cli::try_parse_from(["bytesift", "-b", "0", "disk.img"]).is_err());
    }

    #[test]
    fn test_cli_ngram_mode_hex_and_decimal() {
        let cli = Cli::parse_from(["bytesift", "-n", "0x3", "f"]);
        assert_eq!(cli.ngram_mode, Some(NgramMode::from_bits(3)));
        let cli = Cli::parse_from(["bytesift", "-n", "0", "f"]);
        assert_eq!(cli.ngram_mode, Some(NgramMode::UNIGRAMS_ONLY));
        assert!(Cli::try_parse_from(["bytesift", "-n", "lots", "f"]).is_err());
    }

    #[test]
    fn test_cli_type_queries() {
        let cli = Cli::parse_from(["bytesift", "-T", "-"]);
        assert_eq!(cli.command().unwrap(), Command::LookupType(TypeQuery::List));
        let cli = Cli::parse_from(["bytesift", "-T", "28"]);
        assert_eq!(cli.command().unwrap(), Command::LookupType(TypeQuery::Code(28)));
        let cli = Cli::parse_from(["bytesift", "-T", "PDF"]);
        assert_eq!(
            cli.command().unwrap(),
            Command::LookupType(TypeQuery::Name("PDF".to_string()))
        );
    }

    #[test]
    fn test_cli_reduce_requires_output() {
        let cli = Cli::parse_from(["bytesift", "-R", "100"]);
        assert!(cli.command().is_err());

        let cli = Cli::parse_from(["bytesift", "-R", "100", "-F", "small.mask"]);
        assert_eq!(
            cli.command().unwrap(),
            Command::ReduceFeatures {
                top_n: 100,
                output: PathBuf::from("small.mask")
            }
        );
    }

    #[test]
    fn test_cli_json_and_train_conflict() {
        assert!(Cli::try_parse_from(["bytesift", "-j", "TEXT", "-t", "TEXT", "f"]).is_err());
        let cli = Cli::parse_from(["bytesift", "-t", "PDF", "f"]);
        assert_eq!(cli.dump_class(), Some("PDF"));
    }

    #[test]
    fn test_cli_debug_default_false() {
        let cli = Cli::parse_from(["bytesift", "f"]);
        assert!(!cli.debug);
        assert!(!cli.report_ranges);
        assert!(cli.config.is_none());
    }
}
