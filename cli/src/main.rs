use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use ddl_schema_core::context::{expand_placeholder, table_context, tables_context};
use ddl_schema_core::{Table, ValidationOptions, validate_tables};
use ddl_schema_extract::cache::ExtractionCache;
use ddl_schema_extract::config::{GeneratorConfig, ParserMode};
use ddl_schema_extract::output::{OutputFormat, format_report, format_tables};
use ddl_schema_extract::parser::ParseOptions;
use ddl_schema_extract::report::{BatchEntry, BatchReport, ExtractionReport};
use ddl_schema_extract::strategy::{SchemaExtractor, build_extractor};
use ddl_schema_extract::{ParseRun, extract_with_report, parse_ddl_with_report};
use tracing::{debug, info, warn};

const BATCH_REPORT_FILE: &str = "batch-report.json";

#[derive(Debug, Parser)]
#[command(name = "ddl-schema")]
#[command(version, about = "Extract table schemas from PostgreSQL DDL scripts")]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a DDL script from a file.
    ParseFile(ParseFileArgs),
    /// Parse a DDL script from stdin.
    ParseStdin(ParseStdinArgs),
    /// Emit the template render context for the tables of a DDL script.
    Context(ContextArgs),
    /// Check extracted tables against the model invariants.
    Validate(ValidateArgs),
    /// Parse many DDL scripts in parallel and write one output per input.
    Batch(BatchArgs),
}

/// Strategy selection shared by every command that extracts tables.
#[derive(Debug, Clone, Args)]
struct ExtractOptions {
    /// Configuration file (YAML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extraction strategy; overrides the configuration file.
    #[arg(long, value_enum)]
    mode: Option<ParserMode>,
    /// Mark every primary-key column non-nullable.
    #[arg(long)]
    force_pk_not_null: bool,
}

#[derive(Debug, Args)]
struct ParseFileArgs {
    /// Path to the DDL script.
    #[arg(long)]
    input: PathBuf,
    /// Output both tables and extraction report.
    #[arg(long)]
    with_report: bool,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    #[command(flatten)]
    extract: ExtractOptions,
}

#[derive(Debug, Args)]
struct ParseStdinArgs {
    /// Output both tables and extraction report.
    #[arg(long)]
    with_report: bool,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    #[command(flatten)]
    extract: ExtractOptions,
}

#[derive(Debug, Args)]
struct ContextArgs {
    /// Path to the DDL script.
    #[arg(long)]
    input: PathBuf,
    /// Only emit the context of this table (case-insensitive).
    #[arg(long)]
    table: Option<String>,
    /// Print this path template once per table with `$table$` expanded.
    #[arg(long)]
    expand: Option<String>,
    #[command(flatten)]
    extract: ExtractOptions,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Path to the DDL script.
    #[arg(long)]
    input: PathBuf,
    /// Also report nullable primary-key columns.
    #[arg(long)]
    strict_primary_keys: bool,
    #[command(flatten)]
    extract: ExtractOptions,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// DDL files and/or directories containing `.sql` files.
    #[arg(long, required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,
    /// Output directory for per-input files and the batch report.
    #[arg(long)]
    output: PathBuf,
    /// Output format for per-input files.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    /// Number of parallel jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    #[command(flatten)]
    extract: ExtractOptions,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::ParseFile(args) => run_parse_file(args),
        Command::ParseStdin(args) => run_parse_stdin(args),
        Command::Context(args) => run_context(args),
        Command::Validate(args) => run_validate(args),
        Command::Batch(args) => run_batch(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Extraction setup
// ---------------------------------------------------------------------------

/// Loads the configuration file (if any) and applies command-line overrides.
fn load_config(options: &ExtractOptions) -> Result<GeneratorConfig, String> {
    let mut config = match &options.config {
        Some(path) => GeneratorConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    if let Some(mode) = options.mode {
        config.parser.mode = mode;
    }
    if options.force_pk_not_null {
        config.parser.force_primary_key_not_null = true;
    }

    config.validate().map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// The extraction strategy selected for one invocation.
enum Extraction {
    /// Lexical parser, reported with its parse diagnostics.
    Standard(ParseOptions),
    /// Any configured strategy, with an optional response cache.
    Strategy {
        extractor: Box<dyn SchemaExtractor>,
        cache: Option<ExtractionCache>,
    },
}

impl Extraction {
    fn from_config(config: &GeneratorConfig) -> Result<Self, String> {
        let options = ParseOptions {
            force_primary_key_not_null: config.parser.force_primary_key_not_null,
        };
        if config.parser.mode == ParserMode::Standard {
            return Ok(Extraction::Standard(options));
        }

        let extractor = build_extractor(config).map_err(|e| e.to_string())?;
        let cache = config.llm.cache_responses.then(|| match &config.llm.cache_dir {
            Some(dir) => ExtractionCache::persistent(dir),
            None => ExtractionCache::in_memory(),
        });
        Ok(Extraction::Strategy { extractor, cache })
    }

    fn name(&self) -> &'static str {
        match self {
            Extraction::Standard(_) => "regex",
            Extraction::Strategy { extractor, .. } => extractor.name(),
        }
    }

    fn run(&mut self, ddl: &str) -> ParseRun {
        match self {
            Extraction::Standard(options) => parse_ddl_with_report(ddl, *options),
            Extraction::Strategy { extractor, cache } => {
                let run = extract_with_report(&**extractor, ddl, cache.as_mut());
                if let Some(cache) = cache {
                    let (hits, misses) = cache.stats();
                    debug!(hits, misses, "Extraction cache statistics");
                }
                run
            }
        }
    }

    /// Extraction without a cache, usable from several threads at once.
    fn run_shared(&self, ddl: &str) -> ParseRun {
        match self {
            Extraction::Standard(options) => parse_ddl_with_report(ddl, *options),
            Extraction::Strategy { extractor, .. } => {
                extract_with_report(&**extractor, ddl, None)
            }
        }
    }
}

fn extract_file(path: &Path, options: &ExtractOptions) -> Result<ParseRun, String> {
    let ddl = read_input(path)?;
    let config = load_config(options)?;
    Ok(Extraction::from_config(&config)?.run(&ddl))
}

fn read_input(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
}

/// Error for a run that produced no tables.
fn empty_result_error(report: &ExtractionReport) -> String {
    let mut reasons: Vec<String> = report.error.iter().cloned().collect();
    reasons.extend(report.warnings.iter().cloned());
    if reasons.is_empty() {
        "No tables extracted".to_string()
    } else {
        format!("No tables extracted: {}", reasons.join("; "))
    }
}

// ---------------------------------------------------------------------------
// parse-file / parse-stdin
// ---------------------------------------------------------------------------

fn run_parse_file(args: ParseFileArgs) -> Result<(), String> {
    let run = extract_file(&args.input, &args.extract)?;
    print_run(&run, args.with_report, args.format)
}

fn run_parse_stdin(args: ParseStdinArgs) -> Result<(), String> {
    let mut ddl = String::new();
    std::io::stdin()
        .read_to_string(&mut ddl)
        .map_err(|err| format!("Failed to read stdin: {err}"))?;
    let config = load_config(&args.extract)?;
    let run = Extraction::from_config(&config)?.run(&ddl);
    print_run(&run, args.with_report, args.format)
}

fn print_run(run: &ParseRun, with_report: bool, format: OutputFormat) -> Result<(), String> {
    if with_report {
        #[derive(serde::Serialize)]
        struct ParseOutput<'a> {
            tables: &'a [Table],
            report: &'a ExtractionReport,
        }

        let output = ParseOutput {
            tables: &run.tables,
            report: &run.report,
        };

        match format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&output)
                    .map_err(|e| format!("Failed to serialize output: {e}"))?;
                println!("{json}");
            }
            OutputFormat::Yaml => {
                let yaml = serde_yaml::to_string(&output)
                    .map_err(|e| format!("Failed to serialize output: {e}"))?;
                println!("{yaml}");
            }
            _ => {
                if run.success() {
                    print!("{}", format_tables(&run.tables, format)?);
                }
                print!("{}", format_report(&run.report, format)?);
            }
        }
    } else if run.success() {
        println!("{}", format_tables(&run.tables, format)?);
    }

    if run.success() {
        for warning in &run.report.warnings {
            warn!("{warning}");
        }
        Ok(())
    } else {
        Err(empty_result_error(&run.report))
    }
}

// ---------------------------------------------------------------------------
// context
// ---------------------------------------------------------------------------

fn run_context(args: ContextArgs) -> Result<(), String> {
    let run = extract_file(&args.input, &args.extract)?;
    if !run.success() {
        return Err(empty_result_error(&run.report));
    }

    let selected: Vec<&Table> = match &args.table {
        Some(name) => {
            let table = run
                .tables
                .iter()
                .find(|t| t.matches(name))
                .ok_or_else(|| format!("Table '{name}' not found in '{}'", args.input.display()))?;
            vec![table]
        }
        None => run.tables.iter().collect(),
    };

    if let Some(template) = &args.expand {
        for table in &selected {
            println!("{}", expand_placeholder(template, table));
        }
        return Ok(());
    }

    let context = match selected.as_slice() {
        [table] if args.table.is_some() => table_context(table),
        _ => tables_context(&run.tables),
    };
    let json = serde_json::to_string_pretty(&context)
        .map_err(|e| format!("Failed to serialize context: {e}"))?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let run = extract_file(&args.input, &args.extract)?;
    if !run.success() {
        return Err(empty_result_error(&run.report));
    }

    let errors = validate_tables(
        &run.tables,
        ValidationOptions {
            strict_primary_keys: args.strict_primary_keys,
        },
    );
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {error}");
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    println!(
        "Validated {} table(s) with {} column(s) and {} foreign key(s).",
        run.report.tables, run.report.columns, run.report.foreign_keys
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

fn run_batch(args: BatchArgs) -> Result<(), String> {
    use rayon::prelude::*;

    let inputs = collect_sql_paths(&args.inputs)?;
    if inputs.is_empty() {
        return Err("No .sql files found in the given inputs".to_string());
    }

    fs::create_dir_all(&args.output).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            args.output.display()
        )
    })?;

    let config = load_config(&args.extract)?;
    let extraction = Extraction::from_config(&config)?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let format = args.format;
    let output_dir = &args.output;
    info!(inputs = inputs.len(), "Starting batch extraction");

    let entries: Vec<BatchEntry> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| batch_one(input, output_dir, format, &extraction))
            .collect()
    });

    let report = BatchReport::new(entries);
    let report_path = args.output.join(BATCH_REPORT_FILE);
    let raw = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("Failed to serialize batch report: {e}"))?;
    fs::write(&report_path, raw)
        .map_err(|err| format!("Failed to write '{}': {err}", report_path.display()))?;

    println!(
        "Extracted {} of {} input(s); report written to '{}'.",
        report.succeeded,
        report.total,
        report_path.display()
    );

    if report.failed > 0 {
        let failed: Vec<String> = report
            .entries
            .iter()
            .filter(|e| !e.report.success)
            .map(|e| e.input.display().to_string())
            .collect();
        eprintln!("{} input(s) failed: {}", report.failed, failed.join(", "));
    }

    if report.succeeded == 0 {
        return Err("No input produced any tables".to_string());
    }
    Ok(())
}

fn batch_one(
    input: &Path,
    output_dir: &Path,
    format: OutputFormat,
    extraction: &Extraction,
) -> BatchEntry {
    let failed = |error: String| BatchEntry {
        input: input.to_path_buf(),
        output: None,
        report: ExtractionReport::failed(extraction.name(), &error, 0),
    };

    let ddl = match read_input(input) {
        Ok(ddl) => ddl,
        Err(error) => return failed(error),
    };
    let run = extraction.run_shared(&ddl);
    if !run.success() {
        return BatchEntry {
            input: input.to_path_buf(),
            output: None,
            report: run.report,
        };
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "schema".to_string());
    let path = output_dir.join(format!("{stem}.{}", format.extension()));
    let written = format_tables(&run.tables, format).and_then(|raw| {
        fs::write(&path, raw).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
    });

    match written {
        Ok(()) => BatchEntry {
            input: input.to_path_buf(),
            output: Some(path),
            report: run.report,
        },
        Err(error) => failed(error),
    }
}

/// Expands directories into their `.sql` files (sorted, non-recursive).
fn collect_sql_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .map_err(|err| format!("Failed to read directory '{}': {err}", input.display()))?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| is_sql_file(path))
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn is_sql_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}
