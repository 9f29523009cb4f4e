use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use uipilot_config::{load_config, UipilotConfig};
use uipilot_core::{DeviceDriver, Engine, EngineConfig, ExecutorConfig, RunReport, RunResult};
use uipilot_driver::{Capabilities, UiAutomator2Config, UiAutomator2Driver};
use uipilot_planners::{
    GeminiVisionClient, GeminiVisionClientConfig, VisionLlmPlanner, VisionPlannerConfig,
};

const DEFAULT_CONFIG_PATH: &str = "config/uipilot.yaml";

#[derive(Debug, Parser)]
#[command(
    name = "uipilot",
    about = "Drive a mobile device UI toward a natural-language goal"
)]
pub struct Cli {
    /// Goal to accomplish, e.g. "Open Views and turn on every toggle"
    #[arg(value_name = "GOAL", required = true)]
    goal: Vec<String>,

    /// Config file; defaults to config/uipilot.yaml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override runtime.max_turns from the config
    #[arg(long)]
    max_turns: Option<usize>,

    #[arg(long)]
    verbose: bool,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        ensure_log_filter(self.verbose);
        init_tracing();

        let goal = self.goal.join(" ");
        let report = match self.launch(&goal).await {
            Ok(report) => report,
            Err(err) => {
                // Everything fallible before the loop is a setup fault.
                let result = RunResult::SystemError(format!("{err:#}"));
                eprintln!("run failed: {result}");
                std::process::exit(1);
            }
        };

        let elapsed = report
            .finished_at
            .signed_duration_since(report.started_at)
            .num_seconds();
        println!(
            "run {} finished: {} ({} turn(s), {}s)",
            report.run_id, report.result, report.turns, elapsed
        );

        if !matches!(report.result, RunResult::GoalAchieved) {
            std::process::exit(1);
        }
        Ok(())
    }

    async fn launch(&self, goal: &str) -> anyhow::Result<RunReport> {
        let config = resolve_config(self.config.as_deref())?;

        // The key check happens before any device session exists, so a
        // missing key never leaves an orphaned session behind.
        let api_key = config
            .planner
            .resolve_api_key()
            .map_err(|err| anyhow::anyhow!("{err}; export it before starting a run"))?;

        let mut engine_config = EngineConfig {
            max_turns: config.runtime.max_turns,
        };
        if let Some(max_turns) = self.max_turns {
            engine_config.max_turns = max_turns;
        }

        let driver_config = UiAutomator2Config {
            server_url: config.server.url.clone(),
            request_timeout_secs: config.server.request_timeout_secs,
            capabilities: Capabilities {
                platform_name: config.device.platform_name.clone(),
                platform_version: config.device.platform_version.clone(),
                device_name: config.device.device_name.clone(),
                app_package: config.device.app_package.clone(),
                app_activity: config.device.app_activity.clone(),
                automation_name: config.device.automation_name.clone(),
                new_command_timeout_secs: config.device.new_command_timeout_secs,
                no_reset: config.device.no_reset,
            },
        };

        let client = GeminiVisionClient::new(GeminiVisionClientConfig {
            api_key,
            model: config.planner.model.clone(),
            endpoint: config.planner.endpoint.clone(),
            temperature: config.planner.temperature,
            timeout_secs: config.planner.request_timeout_secs,
        })
        .context("build planner client")?;

        let planner = VisionLlmPlanner::new(
            client,
            VisionPlannerConfig {
                timeout_secs: config.planner.plan_timeout_secs,
                ..VisionPlannerConfig::default()
            },
        );

        let executor_config = ExecutorConfig {
            element_wait: Duration::from_secs(config.runtime.element_wait_secs),
            settle_delay: Duration::from_secs(config.runtime.settle_delay_secs),
            diagnostics_dir: config.runtime.diagnostics_dir.clone(),
        };

        info!(
            server = %config.server.url,
            device = %config.device.device_name,
            %goal,
            "opening device session"
        );
        let driver = UiAutomator2Driver::open(driver_config)
            .await
            .context("open device session")?;
        let driver: Arc<dyn DeviceDriver> = Arc::new(driver);

        let engine = Engine::with_config(Box::new(planner), driver, engine_config, executor_config);
        Ok(engine.run(goal).await)
    }
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<UipilotConfig> {
    match path {
        Some(path) => {
            load_config(path).with_context(|| format!("load config from {}", path.display()))
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
                    .with_context(|| format!("load config from {}", default_path.display()))
            } else {
                Ok(UipilotConfig::default())
            }
        }
    }
}

fn ensure_log_filter(verbose: bool) {
    if env::var("RUST_LOG").is_ok() {
        return;
    }
    let level = if verbose { "debug" } else { "info" };
    env::set_var("RUST_LOG", level);
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
