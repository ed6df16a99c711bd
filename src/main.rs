use std::fs::File;
use std::io::{self, Read};

use anyhow::{Context, Result};
use bytesift::cli::{Cli, Command, TypeQuery};
use bytesift::config::ClassifierConfig;
use bytesift::error::ClassifierError;
use bytesift::model::{ModelSource, SharedModel};
use bytesift::scan::{scan_with, ScanOptions, ScanRecord};
use bytesift::session::{ClassificationSession, SessionOptions};
use bytesift::types::TypeNameTable;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file (if any) with command-line overrides applied
fn load_config(args: &Cli) -> Result<ClassifierConfig> {
    let mut config = match &args.config {
        Some(path) => ClassifierConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ClassifierConfig::default(),
    };

    if let Some(mode) = args.ngram_mode {
        config.ngram_mode = mode;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Err(msg) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", msg);
    }
    Ok(config)
}

fn open_session(args: &Cli, config: &ClassifierConfig) -> Result<ClassificationSession> {
    let mut options = SessionOptions::from_config(config);
    options.class_file = args.class_file.clone();
    options.mask_file = args.mask.clone();

    let source = match &args.model {
        Some(path) => ModelSource::File(path.clone()),
        None => {
            SharedModel::configure_global(config.resolved_model_path());
            ModelSource::Default
        }
    };

    ClassificationSession::open(source, options).context("Cannot open classification session")
}

/// `-T`: answer from the type table alone, no model needed
fn lookup_type(args: &Cli, query: TypeQuery) -> Result<()> {
    let table = match &args.class_file {
        Some(path) => TypeNameTable::with_class_file(path)
            .with_context(|| format!("Failed to read class file {}", path.display()))?,
        None => TypeNameTable::builtin(),
    };

    match query {
        TypeQuery::List => {
            for (code, name) in table.iter() {
                println!("{:>3} {}", code, name);
            }
        }
        TypeQuery::Code(code) => match table.name_for_type(code) {
            Some(name) => println!("{}", name),
            None => anyhow::bail!("Unknown type code: {}", code),
        },
        TypeQuery::Name(name) => println!("{}", table.type_for_name(&name)?),
    }
    Ok(())
}

fn reduce_features(
    args: &Cli,
    config: &ClassifierConfig,
    top_n: usize,
    output: &std::path::Path,
) -> Result<()> {
    let mut session = open_session(args, config)?;
    match session.reduce_features(output, top_n) {
        Ok(summary) => {
            println!(
                "Reduced {} features to {} (top {} per class, rate {:.4}); mask written to {}",
                summary.before,
                summary.after,
                summary.top_n,
                summary.rate(),
                output.display()
            );
        }
        Err(ClassifierError::FeatureReductionNoop { requested }) => {
            anyhow::bail!(
                "Keeping the top {} features per class keeps every feature; try a smaller value",
                requested
            );
        }
        Err(e) => return Err(e).context("Feature reduction failed"),
    }
    session.close();
    Ok(())
}

/// Coalesces consecutive records of one type into ranges on stderr
struct RangeReporter<'a> {
    input: &'a str,
    current: Option<(u64, u64, i32)>,
}

impl<'a> RangeReporter<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            current: None,
        }
    }

    fn record(&mut self, record: &ScanRecord, types: &TypeNameTable) {
        let end = record.offset + record.length;
        if let Some((_, current_end, code)) = self.current.as_mut() {
            if *code == record.code && *current_end == record.offset {
                *current_end = end;
                return;
            }
        }
        self.flush(types);
        self.current = Some((record.offset, end, record.code));
    }

    fn flush(&mut self, types: &TypeNameTable) {
        if let Some((start, end, code)) = self.current.take() {
            eprintln!(
                "{}-{} {} # {}",
                start,
                end,
                types.display_name(code),
                self.input
            );
        }
    }
}

fn classify_input(
    session: &mut ClassificationSession,
    input: &str,
    options: ScanOptions,
    types: &TypeNameTable,
    args: &Cli,
) -> Result<()> {
    let reader: Box<dyn Read> = if input == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(input).with_context(|| format!("Cannot open {}", input))?)
    };
    session.set_input_name(Some(input.to_string()));

    let dumping = session.is_dumping();
    let mut ranges = RangeReporter::new(input);
    scan_with(session, reader, options, |record| {
        if !dumping {
            println!(
                "{:<10} {} # {}",
                record.offset,
                types.display_name(record.code),
                input
            );
        }
        if args.report_ranges {
            ranges.record(record, types);
        }
        Ok(())
    })
    .with_context(|| format!("Failed to classify {}", input))?;
    ranges.flush(types);
    Ok(())
}

fn classify_inputs(args: &Cli, config: &ClassifierConfig) -> Result<()> {
    let mut session = open_session(args, config)?;

    if let Some(path) = &args.write_mask {
        session
            .dump_mask(path)
            .with_context(|| format!("Failed to write mask {}", path.display()))?;
    }

    if let Some(class) = args.dump_class() {
        let code = session.type_for_name(class)?;
        if args.json.is_some() {
            session.dump_json_on_classify(code, Box::new(io::stdout()));
        } else {
            session.dump_nodes_on_classify(code, Box::new(io::stdout()));
        }
    }

    let options = ScanOptions {
        block_size: config.block_size,
        per_block: args.block_size.is_some(),
        omit_first_block: args.omit_first_block,
    };
    let types = session.types().clone();

    let mut failures = 0;
    for input in &args.inputs {
        if let Err(e) = classify_input(&mut session, input, options, &types, args) {
            eprintln!("bytesift: {:#}", e);
            failures += 1;
        }
    }
    session.close();

    if failures > 0 {
        anyhow::bail!("{} of {} inputs could not be classified", failures, args.inputs.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing (TRACE with --debug, otherwise RUST_LOG)
    init_tracing(args.debug);

    let command = match args.command() {
        Ok(command) => command,
        Err(msg) => anyhow::bail!("{}", msg),
    };
    let config = load_config(&args)?;

    match command {
        Command::LookupType(query) => lookup_type(&args, query),
        Command::ReduceFeatures { top_n, output } => {
            reduce_features(&args, &config, top_n, &output)
        }
        Command::Classify => classify_inputs(&args, &config),
    }
}
