//! Run command handler

use super::config::load_suite_config;
use super::validate::validate_feature_file;
use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use caseflow::pages::standard_registry;
use caseflow::{
    ActorFactory, CaseflowConfig, Feature, FeatureRunner, Reporter, ScenarioRunner, StepRegistry,
};
use std::path::Path;
#[cfg(test)]
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything a run needs, loaded and validated up front
#[derive(Debug)]
pub struct RunPlan {
    pub config: Arc<CaseflowConfig>,
    pub registry: Arc<StepRegistry>,
    pub features: Vec<Feature>,
}

/// Load configuration and features; any invalid feature file aborts the run
pub fn plan(args: &RunArgs) -> CliResult<RunPlan> {
    let mut config = load_suite_config(args.config.as_deref())?;
    if let Some(dir) = &args.output {
        config = config.with_output_dir(dir.clone());
    }
    if args.headed {
        config.flags.show_browser = true;
    }

    let registry = standard_registry()?;
    let features = args
        .features
        .iter()
        .map(|path| {
            validate_feature_file(path, &registry, &config)
                .map_err(|e| CliError::config(format!("{}: {e}", path.display())))
        })
        .collect::<CliResult<Vec<_>>>()?;

    Ok(RunPlan {
        config: Arc::new(config),
        registry: Arc::new(registry),
        features,
    })
}

/// Run every planned feature on actors from `actors`
pub async fn run_plan(
    plan: &RunPlan,
    actors: Arc<dyn ActorFactory>,
    cli: &CliConfig,
) -> CliResult<Reporter> {
    let scenarios = ScenarioRunner::new(
        Arc::clone(&plan.registry),
        Arc::clone(&plan.config),
        actors,
    );
    let runner = FeatureRunner::new(scenarios)
        .with_failure_mode(cli.failure_mode())
        .with_workers(cli.workers);

    let mut reporter = Reporter::new(plan.config.environment.clone());
    for report in runner.run_all(&plan.features).await? {
        reporter.record(report);
    }
    Ok(reporter)
}

/// Print results, write the report directory, fail if any feature failed
pub fn finish(
    reporter: &Reporter,
    output_dir: &Path,
    printer: &Printer,
    started: Instant,
) -> CliResult<()> {
    printer.header(&reporter.summary());
    for feature in reporter.features() {
        printer.feature(feature);
    }
    let paths = reporter.write(output_dir)?;
    printer.info(&format!("report: {}", paths.html.display()));
    for shot in &paths.screenshots {
        printer.info(&format!("screenshot: {}", shot.display()));
    }
    printer.summary(reporter, started.elapsed());

    if reporter.all_passed() {
        Ok(())
    } else {
        Err(CliError::RunFailed {
            failed: reporter.failed_count(),
            total: reporter.features().len(),
        })
    }
}

#[cfg(feature = "browser")]
fn browser_actors(args: &RunArgs, config: &CaseflowConfig) -> CliResult<Arc<dyn ActorFactory>> {
    let mut browser = caseflow::BrowserConfig::from_config(config);
    if let Some(path) = &args.chromium {
        browser = browser.with_chromium_path(path.clone());
    }
    if args.no_sandbox {
        browser = browser.with_no_sandbox();
    }
    Ok(Arc::new(caseflow::ChromiumActorFactory::new(browser)))
}

#[cfg(not(feature = "browser"))]
fn browser_actors(_args: &RunArgs, _config: &CaseflowConfig) -> CliResult<Arc<dyn ActorFactory>> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}

/// Execute the run command
pub fn execute_run(args: &RunArgs, cli: &CliConfig, printer: &mut Printer) -> CliResult<()> {
    let started = Instant::now();
    let plan = plan(args)?;
    let actors = browser_actors(args, &plan.config)?;
    let cli = cli.clone().with_workers(args.workers).with_fail_fast(args.fail_fast);

    info!(
        features = plan.features.len(),
        workers = cli.workers,
        environment = %plan.config.environment,
        "run started"
    );
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    printer.start_spinner(&format!("running {} features", plan.features.len()));
    let result = runtime.block_on(run_plan(&plan, actors, &cli));
    printer.finish_spinner();

    finish(&result?, &plan.config.output_dir, printer, started)
}
