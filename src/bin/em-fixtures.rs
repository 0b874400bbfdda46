use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use em_fixtures::engine::{EngineCall, EngineLauncher};
use em_fixtures::error::{log_container_error, log_engine_error};
use em_fixtures::{
    init_logging, ConfigTranslator, EngineSessionManager, FixturePlan, FixtureVariantPatcher,
    HarnessConfig, JsonContainerStore, ProcessEngine, RecordingEngine,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "em-fixtures",
    about = "Reference fixture generation for the electromagnetics solver test suite"
)]
struct Cli {
    /// Harness configuration JSON (defaults to a layout rooted at the plan's directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the engine calls a plan would make, without starting the engine
    Calls {
        #[arg(long)]
        plan: PathBuf,
    },
    /// Run input generation for a plan in one engine session, then derive its variants
    Generate {
        #[arg(long)]
        plan: PathBuf,
        /// Skip variant derivation
        #[arg(long)]
        no_variants: bool,
    },
    /// Derive a single container variant
    Patch {
        /// Fixture directory holding the source container
        #[arg(long)]
        dir: PathBuf,
        /// Output filename, relative to --dir
        #[arg(long)]
        output: PathBuf,
        /// Override mapping as JSON, e.g. '{"adjust": "fdtd.json", "solver_method": "pstd"}'
        #[arg(long)]
        overrides: String,
    },
}

#[derive(Serialize)]
struct PlannedCall {
    session: u32,
    rendered: String,
    #[serde(flatten)]
    call: EngineCall,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Calls { plan } => run_calls(cli.config.as_deref(), &plan),
        Commands::Generate { plan, no_variants } => {
            run_generate(cli.config.as_deref(), &plan, !no_variants)
        }
        Commands::Patch {
            dir,
            output,
            overrides,
        } => run_patch(&dir, &output, &overrides),
    }
}

fn plan_root(plan_path: &Path) -> PathBuf {
    match plan_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_harness(config: Option<&Path>, root: &Path) -> HarnessConfig {
    match config {
        Some(path) => HarnessConfig::load_from_file(path),
        None => HarnessConfig::rooted_at(root),
    }
}

fn load_plan(plan_path: &Path) -> Result<FixturePlan> {
    FixturePlan::load(plan_path)
        .with_context(|| format!("loading fixture plan {}", plan_path.display()))
}

fn run_batch<L: EngineLauncher>(
    launcher: L,
    harness: &HarnessConfig,
    plan: &FixturePlan,
    root: &Path,
    kill_on_complete: bool,
) -> Result<()> {
    let translator = ConfigTranslator::from_config(harness);
    let batch = plan
        .call_batch(&translator, root)
        .context("translating input_generation entries")?;
    let mut manager = EngineSessionManager::from_config(launcher, harness, batch);

    match manager.run(kill_on_complete) {
        Ok(report) => {
            tracing::info!(
                calls = report.outputs.len(),
                cwd = %report.working_directory.display(),
                "batch complete"
            );
        }
        Err(err) if err.is_warning() => log_engine_error(&err, "em-fixtures"),
        Err(err) => {
            log_engine_error(&err, "em-fixtures");
            return Err(err).context("running engine batch");
        }
    }
    Ok(())
}

fn run_calls(config: Option<&Path>, plan_path: &Path) -> Result<ExitCode> {
    let root = plan_root(plan_path);
    let harness = load_harness(config, &root);
    let plan = load_plan(plan_path)?;

    let engine = RecordingEngine::new();
    run_batch(engine.clone(), &harness, &plan, &root, true)?;

    let planned: Vec<PlannedCall> = engine
        .calls()
        .into_iter()
        .map(|(session, call)| PlannedCall {
            session,
            rendered: call.render(),
            call,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&planned)?);
    Ok(ExitCode::from(0))
}

fn run_generate(config: Option<&Path>, plan_path: &Path, derive_variants: bool) -> Result<ExitCode> {
    let root = plan_root(plan_path);
    let harness = load_harness(config, &root);
    let plan = load_plan(plan_path)?;

    // A failed batch drops the manager, which kills the engine process.
    let engine = ProcessEngine::from_config(&harness.engine);
    run_batch(engine, &harness, &plan, &root, true)?;
    if !derive_variants {
        return Ok(ExitCode::from(0));
    }

    let patcher = FixtureVariantPatcher::new(JsonContainerStore);
    let written = plan.derive_variants(&patcher, &root).map_err(|err| {
        log_container_error(&err, "em-fixtures generate");
        err
    })?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(ExitCode::from(0))
}

fn run_patch(dir: &Path, output: &Path, overrides: &str) -> Result<ExitCode> {
    let overrides: serde_json::Value =
        serde_json::from_str(overrides).context("parsing --overrides JSON")?;
    if !overrides.is_object() {
        bail!("--overrides must be a JSON object");
    }

    let patcher = FixtureVariantPatcher::new(JsonContainerStore);
    let written = patcher
        .patch(dir, output, &overrides)
        .with_context(|| format!("patching container in {}", dir.display()))?;
    println!("{}", written.display());
    Ok(ExitCode::from(0))
}
