use clap::{Parser, Subcommand};
use policycalc::cli::{self, SuggestMode};
use policycalc::config::{OutputFormat, CONFIG_ENV};
use policycalc::error::CalcResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "policycalc")]
#[command(about = "Apply extracted insurance formulas to policy tables, filling only missing values.")]
#[command(long_about = "PolicyCalc - Insurance formula engine

Extracts formulas from policy documents, rewrites them over a controlled
vocabulary of variables and applies them row by row to policy tables.
Existing values are never overwritten.

COMMANDS:
  process    - Apply a formula file to a CSV/XLSX policy table
  formulas   - Validate and list a formula file
  eval       - Evaluate a single expression
  variables  - List the variable vocabulary
  extract    - Suggest formulas from a document

EXAMPLES:
  policycalc process policies.csv --formulas formulas.yaml
  policycalc eval \"premium * 10\" --set premium=1000
  policycalc extract brochure.txt --target SURRENDER_VALUE -o formulas.yaml

LOGGING:
  RUST_LOG=policycalc=debug policycalc process ...")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Apply a formula file to a policy table.

Each row's COVER_CODE selects a product variant; every formula is evaluated
in file order, using the variant's override expression when there is one.
Results are written only into cells that are empty or zero, and later
formulas can read the results of earlier ones in the same row.

The augmented table is written to the output directory as
processed_output_<timestamp>.xlsx (or .csv).

FORMULA FILE (YAML or JSON):
  - name: total_premium
    expression: premium * 10
    variants:
      Variant 2: premium * 12")]
    /// Apply formulas to a CSV/XLSX policy table
    Process {
        /// Policy table (.csv, .xlsx, .xls, .ods)
        input: PathBuf,

        /// Formula file (.yaml, .yml or .json)
        #[arg(short, long)]
        formulas: PathBuf,

        /// Processing config (YAML)
        #[arg(short, long, env = CONFIG_ENV)]
        config: Option<PathBuf>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format: xlsx or csv (overrides config)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Show verbose processing steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate and list a formula file
    Formulas {
        /// Formula file (.yaml, .yml or .json)
        file: PathBuf,

        /// Show the variables each expression reads
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Evaluate a single expression.

Supports + - * / ** (and ^), parentheses, pi, e and the functions
max, min, abs, round, sqrt, exp, log, sin, cos, tan.
Unbound variables read as 0 and are reported.

EXAMPLES:
  policycalc eval \"(1 + rate) ^ term\" --set rate=0.05 --set term=10
  policycalc eval \"round(sa / 3, 2)\" --set sa=100000")]
    /// Evaluate a single expression
    Eval {
        /// Expression to evaluate
        expression: String,

        /// Variable binding NAME=VALUE (repeatable)
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        bindings: Vec<String>,
    },

    /// List the variable vocabulary
    Variables {
        /// Only this category: insurance or financial
        #[arg(short, long)]
        category: Option<String>,
    },

    #[command(long_about = "Suggest formulas from a text document.

Reads .txt/.md documents (other document types need an external text
extractor), finds formula statements and rewrites them over canonical
variable names.

MODES:
  auto      - structured 'ACR: Name - Description = Formula' lines, then prose
  pattern   - prose sentences such as 'Premium = Base Rate × Coverage'
  response  - structured lines only")]
    /// Suggest formulas from a document
    Extract {
        /// Document to read
        document: PathBuf,

        /// Keep only formulas for these variables (repeatable)
        #[arg(short, long = "target")]
        targets: Vec<String>,

        /// Suggestion mode
        #[arg(short, long, value_enum, default_value_t = SuggestMode::Auto)]
        mode: SuggestMode,

        /// Save the records as a formula file (.yaml or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> CalcResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("policycalc=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            formulas,
            config,
            output_dir,
            format,
            verbose,
        } => cli::process(input, formulas, config, output_dir, format, verbose),

        Commands::Formulas { file, verbose } => cli::formulas(file, verbose),

        Commands::Eval {
            expression,
            bindings,
        } => cli::eval(expression, bindings),

        Commands::Variables { category } => cli::variables(category),

        Commands::Extract {
            document,
            targets,
            mode,
            output,
        } => cli::extract(document, targets, mode, output),
    }
}
