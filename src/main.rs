use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use eligibility::config::AppConfig;
use eligibility::error::AppError;
use eligibility::programs::state::State;
use eligibility::programs::{self, tables, Clause, ContextInput, Program, StateInput};
use eligibility::telemetry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "eligibility",
    about = "Score applicant profiles against eligibility programs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program against a profile and print the annotated result
    Evaluate(EvaluateArgs),
    /// Check a program definition and print a clause summary
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Program definition (JSON)
    #[arg(long)]
    program: PathBuf,
    /// Applicant profile (JSON)
    #[arg(long)]
    profile: PathBuf,
    /// Reference data bundle (JSON)
    #[arg(long)]
    context: Option<PathBuf>,
    /// Directory of reference table CSV exports
    #[arg(long)]
    tables: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD); overrides the configured date
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Program definition (JSON)
    #[arg(long)]
    program: PathBuf,
}

#[derive(Debug, Serialize)]
struct ProgramSummary {
    id: String,
    dependencies: Vec<String>,
    clauses: Vec<ClauseSummary>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClauseSummary {
    Output {
        state: &'static str,
        leaves: usize,
        weight: f64,
        decisive: bool,
    },
    Eval {
        contributors: usize,
    },
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Evaluate(args) => run_evaluate(args, &config),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<(), AppError> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

fn run_evaluate(args: EvaluateArgs, config: &AppConfig) -> Result<(), AppError> {
    let program: Program = read_json(&args.program)?;
    let profile: StateInput = read_json(&args.profile)?;

    let mut context = match &args.context {
        Some(path) => read_json::<ContextInput>(path)?,
        None => ContextInput::default(),
    };
    if let Some(dir) = &args.tables {
        context.merge(tables::load_dir(dir)?);
    }
    if let Some(today) = args.today.or(config.evaluation.evaluation_date) {
        context.now = Some(today);
    }

    info!(
        program = %program.id,
        environment = ?config.environment,
        exchange_rates = context.exchange_rates.len(),
        crosswalks = context.occupation_crosswalks.len(),
        "evaluating program"
    );

    let output = programs::run(&program, &context, &profile)?;
    print_json(&output, args.compact)
}

fn run_inspect(args: InspectArgs) -> Result<(), AppError> {
    let program: Program = read_json(&args.program)?;
    programs::validate(&program)?;

    let summary = ProgramSummary {
        id: program.id.clone(),
        dependencies: program.dependencies.clone(),
        clauses: program.clauses.iter().map(summarize).collect(),
    };
    print_json(&summary, false)
}

fn summarize(clause: &Clause) -> ClauseSummary {
    match clause {
        Clause::Output(output) => ClauseSummary::Output {
            state: output.state.kind(),
            leaves: State::leaf_count(&output.state),
            weight: output.weight(),
            decisive: output.decisive,
        },
        Clause::Eval(eval) => ClauseSummary::Eval {
            contributors: eval.contributors.len(),
        },
    }
}
