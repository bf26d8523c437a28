use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use colored::Colorize;

use crate::config::{OutputFormat, ProcessingConfig};
use crate::core::expression::{CompiledExpression, SymbolTable};
use crate::core::registry::{self, FormulaRegistry, FormulaSet};
use crate::core::{process_file, ProcessingSummary};
use crate::error::{CalcError, CalcResult};
use crate::extract::{
    extract_formulas, FallbackSuggester, FormulaSuggester, PatternSuggester, PlainTextExtractor,
    ResponseSuggester,
};
use crate::vocabulary::{self, Category};

/// Which local suggester reads the document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum SuggestMode {
    /// Structured response lines first, prose patterns if none are found
    #[default]
    Auto,
    /// Prose patterns only (`Premium = ...`)
    Pattern,
    /// `ACR: Full Name - Description = Formula` lines only
    Response,
}

impl SuggestMode {
    pub fn suggester(self) -> CalcResult<Box<dyn FormulaSuggester>> {
        Ok(match self {
            SuggestMode::Auto => Box::new(FallbackSuggester::local()?),
            SuggestMode::Pattern => Box::new(PatternSuggester::new()?),
            SuggestMode::Response => Box::new(ResponseSuggester::new()?),
        })
    }
}

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Load and validate a formula file, printing what it holds
fn load_formulas(path: &Path, verbose: bool) -> CalcResult<Arc<FormulaSet>> {
    if verbose {
        println!("{}", "📖 Loading formulas...".cyan());
    }
    let registry = FormulaRegistry::new();
    let set = registry.load_file(path)?;

    if verbose {
        println!("   Loaded {} formulas (version {})\n", set.len(), set.version);
    }
    Ok(set)
}

/// Execute the process command
pub fn process(
    input: PathBuf,
    formulas: PathBuf,
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: Option<OutputFormat>,
    verbose: bool,
) -> CalcResult<()> {
    println!("{}", "🧮 PolicyCalc - Processing policy table".bold().green());
    println!("   Input:    {}", input.display());
    println!("   Formulas: {}", formulas.display());
    println!();

    let mut settings = ProcessingConfig::load(config.as_deref())?;
    if let Some(dir) = output_dir {
        settings.output_dir = dir;
    }
    if let Some(format) = format {
        settings.output_format = format;
    }

    let set = load_formulas(&formulas, verbose)?;
    if set.is_empty() {
        println!("{}", "⚠️  No formulas loaded, the table will be copied unchanged".yellow());
    }

    if verbose {
        println!("{}", "⚙️  Applying formulas...".cyan());
    }
    let summary = process_file(&input, &set, &settings)?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &ProcessingSummary) {
    if summary.is_success() {
        println!("{}", format!("✅ {}", summary.message).bold().green());
    } else {
        println!("{}", format!("⚠️  {}", summary.message).bold().yellow());
    }

    println!("   Rows:                    {}", summary.total_rows);
    println!("   Processed rows:          {}", summary.processed_rows);
    println!("   Successful calculations: {}", summary.successful_calculations);
    println!("   Formulas used:           {}", summary.formulas_used);
    if !summary.new_columns_created.is_empty() {
        println!(
            "   New columns:             {}",
            summary.new_columns_created.join(", ")
        );
    }
    if let Some(path) = &summary.output_path {
        println!("   Output:                  {}", path.bright_blue());
    }

    if !summary.errors.is_empty() {
        println!("\n{}", format!("❌ Errors ({})", summary.total_errors).bold().red());
        for error in &summary.errors {
            println!("   {}", error.red());
        }
        if summary.hidden_errors() > 0 {
            println!("   ... and {} more", summary.hidden_errors());
        }
    }

    if !summary.warnings.is_empty() {
        println!(
            "\n{}",
            format!("⚠️  Warnings ({})", summary.total_warnings).bold().yellow()
        );
        for warning in &summary.warnings {
            println!("   {}", warning.yellow());
        }
        let hidden = summary.total_warnings.saturating_sub(summary.warnings.len());
        if hidden > 0 {
            println!("   ... and {} more", hidden);
        }
    }
    println!();
}

/// Execute the formulas command: validate and list a formula file
pub fn formulas(file: PathBuf, verbose: bool) -> CalcResult<()> {
    println!("{}", "🧮 PolicyCalc - Formula check".bold().green());
    println!("   File: {}\n", file.display());

    let set = load_formulas(&file, verbose)?;
    let mut invalid = 0;

    for (i, formula) in set.formulas().iter().enumerate() {
        let expression = formula.expression();
        let status = match expression.error() {
            Some(_) => "❌".to_string(),
            None if expression.is_empty() => "⏭️ ".to_string(),
            None => "✅".to_string(),
        };
        println!(
            "{} {:>2}. {} = {}",
            status,
            i + 1,
            formula.name().bold(),
            expression.source()
        );
        report_expression(expression, "      ", verbose, &mut invalid);

        for (variant, override_expr) in formula.variants() {
            println!("      {} {} = {}", variant.cyan(), formula.key(), override_expr.source());
            report_expression(override_expr, "        ", verbose, &mut invalid);
        }
    }
    println!();

    if invalid > 0 {
        return Err(CalcError::Validation(format!(
            "{} expression(s) failed to parse",
            invalid
        )));
    }

    println!(
        "{}",
        format!("✅ {} formulas are valid", set.len()).bold().green()
    );
    Ok(())
}

fn report_expression(expression: &CompiledExpression, indent: &str, verbose: bool, invalid: &mut usize) {
    if let Some(e) = expression.error() {
        *invalid += 1;
        println!("{}{}", indent, e.to_string().red());
    } else if verbose && !expression.is_empty() {
        let variables = expression.variables();
        if !variables.is_empty() {
            println!("{}uses: {}", indent, variables.join(", ").bright_black());
        }
    }
}

/// Execute the eval command: evaluate one expression
pub fn eval(expression: String, bindings: Vec<String>) -> CalcResult<()> {
    let mut symbols = SymbolTable::new();
    for binding in &bindings {
        let (name, value) = binding.split_once('=').ok_or_else(|| {
            CalcError::Validation(format!("Binding '{}' must be NAME=VALUE", binding))
        })?;
        let value: f64 = value.trim().parse().map_err(|_| {
            CalcError::Validation(format!("'{}' is not a number in '{}'", value.trim(), binding))
        })?;
        symbols.bind(name, value);
    }

    let compiled = CompiledExpression::compile(&expression);
    match compiled.evaluate(&symbols) {
        Ok(Some(evaluation)) => {
            println!("{}", format_number(evaluation.value).bold().green());
            for name in &evaluation.missing {
                println!(
                    "{}",
                    format!("⚠️  variable '{}' not found, using 0", name).yellow()
                );
            }
            Ok(())
        }
        Ok(None) => {
            println!("{}", "(empty expression)".bright_black());
            Ok(())
        }
        Err(e) => Err(CalcError::Eval(format!("{}: {}", expression.trim(), e))),
    }
}

/// Execute the variables command: list the vocabulary
pub fn variables(category: Option<String>) -> CalcResult<()> {
    let categories = match category.as_deref().map(str::to_lowercase).as_deref() {
        None => vec![Category::Insurance, Category::Financial],
        Some("insurance") => vec![Category::Insurance],
        Some("financial") => vec![Category::Financial],
        Some(other) => {
            return Err(CalcError::Validation(format!(
                "Unknown category '{}' (expected insurance or financial)",
                other
            )))
        }
    };

    for category in categories {
        println!("{}", format!("{:?} variables", category).bold().green());
        for variable in vocabulary::by_category(category) {
            let role = vocabulary::role(variable.name)
                .map(|r| format!(" [{}]", r))
                .unwrap_or_default();
            println!(
                "   {:<20} {}{}",
                variable.name.bold(),
                variable.description,
                role.bright_black()
            );
            if !variable.aliases.is_empty() {
                println!("   {:<20} {}", "", variable.aliases.join(", ").bright_black());
            }
        }
        println!();
    }
    Ok(())
}

/// Execute the extract command: document → formula records
pub fn extract(
    document: PathBuf,
    targets: Vec<String>,
    mode: SuggestMode,
    output: Option<PathBuf>,
) -> CalcResult<()> {
    println!("{}", "🧮 PolicyCalc - Formula extraction".bold().green());
    println!("   Document: {}", document.display());
    if !targets.is_empty() {
        println!("   Targets:  {}", targets.join(", "));
    }
    println!();

    let suggester = mode.suggester()?;
    let report = extract_formulas(&document, &PlainTextExtractor, suggester.as_ref(), &targets)?;

    println!("{}", report.message.bold());
    for record in &report.formulas {
        let acronym = record.acronym.as_deref().unwrap_or("-");
        println!(
            "   {:<5} {} = {}",
            acronym.cyan(),
            record.name.bold(),
            record.expression
        );
        if let Some(context) = &record.business_context {
            println!("         {}", context.bright_black());
        }
    }
    println!();

    if let Some(path) = output {
        registry::save_records(&path, &report.formulas)?;
        println!(
            "{}",
            format!("✅ Saved {} formulas to {}", report.formulas.len(), path.display())
                .bold()
                .green()
        );
    }
    Ok(())
}
