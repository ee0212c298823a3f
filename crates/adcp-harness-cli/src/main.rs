//! AdCP Conformance Harness CLI
//!
//! The `adcp-harness` command runs capability-driven conformance scenarios
//! against a live AdCP agent.
//!
//! ## Commands
//!
//! - `run`: Discover the agent and run every applicable scenario
//! - `scenario`: Run one scenario
//! - `scenarios`: Preview which scenarios apply to a tool list
//! - `list`: List scenario identifiers and their required operations

mod telemetry;

use adcp_client::Protocol;
use adcp_harness::{
    plan_scenarios, render_suite_markdown, render_suite_result, render_test_result,
    required_tools, to_json, Harness, HarnessOptions, Scenario, ScenarioPlan, SuiteResult,
    TestResult, DEFAULT_SCENARIOS,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "adcp-harness")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Capability-driven conformance testing for AdCP agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the agent and run every applicable scenario
    Run {
        /// Agent endpoint URL
        agent_url: String,

        /// Only run these scenarios (repeatable)
        #[arg(short, long = "scenario")]
        scenarios: Vec<Scenario>,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Run a single scenario
    Scenario {
        /// Agent endpoint URL
        agent_url: String,

        /// Scenario identifier, e.g. `create_media_buy`
        scenario: Scenario,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Show which scenarios apply to an agent exposing the given operations
    Scenarios {
        /// Comma-separated operation names
        #[arg(long, value_delimiter = ',')]
        tools: Vec<String>,
    },

    /// List scenario identifiers with their required operations
    List,
}

/// Options shared by the commands that talk to an agent.
#[derive(Args, Debug, Clone, Default)]
struct AgentArgs {
    /// Bearer token for the agent
    #[arg(long, env = "ADCP_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Transport (mcp or a2a); detected from the URL when omitted
    #[arg(long, env = "ADCP_PROTOCOL")]
    protocol: Option<Protocol>,

    /// Brief used for product discovery
    #[arg(long, env = "ADCP_TEST_BRIEF")]
    brief: Option<String>,

    /// Budget for test media buys
    #[arg(long, env = "ADCP_TEST_BUDGET")]
    budget: Option<f64>,

    /// Ask the agent to simulate mutations (default: true)
    #[arg(long, env = "ADCP_DRY_RUN", value_parser = clap::builder::BoolishValueParser::new())]
    dry_run: Option<bool>,

    /// Session correlation id (generated when omitted)
    #[arg(long, env = "ADCP_TEST_SESSION_ID")]
    session_id: Option<String>,

    /// Only consider products in this channel (repeatable)
    #[arg(long = "channel")]
    channels: Vec<String>,

    /// Only consider pricing options with this model (repeatable)
    #[arg(long = "pricing-model")]
    pricing_models: Vec<String>,

    /// Creative format to target (repeatable)
    #[arg(long = "format-id")]
    format_ids: Vec<String>,

    /// Signal type to query (repeatable)
    #[arg(long = "signal-type")]
    signal_types: Vec<String>,

    /// How many creative formats to exercise
    #[arg(long)]
    max_formats: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl AgentArgs {
    fn into_options(self, scenarios: Vec<Scenario>) -> HarnessOptions {
        HarnessOptions {
            brief: self.brief,
            budget: self.budget,
            format_ids: self.format_ids,
            session_id: self.session_id,
            dry_run: self.dry_run,
            channels: self.channels,
            pricing_models: self.pricing_models,
            auth_token: self.auth_token,
            scenarios,
            protocol: self.protocol,
            max_formats: self.max_formats,
            signal_types: self.signal_types,
            timeout_secs: self.timeout,
            ..HarnessOptions::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    let (report, passed) = match cli.command {
        Commands::Run {
            agent_url,
            scenarios,
            agent,
        } => {
            let options = agent.into_options(scenarios);
            let suite = Harness::http().test_all_scenarios(&agent_url, &options).await;
            (render_suite(&suite, cli.format)?, suite.overall_passed)
        }
        Commands::Scenario {
            agent_url,
            scenario,
            agent,
        } => {
            let options = agent.into_options(Vec::new());
            let result = Harness::http()
                .test_agent(&agent_url, scenario, &options)
                .await;
            (render_single(&result, cli.format)?, result.overall_passed)
        }
        Commands::Scenarios { tools } => {
            let tools: BTreeSet<String> = tools
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let plan = plan_scenarios(&tools, None);
            (render_plan(&plan, cli.format)?, true)
        }
        Commands::List => (render_catalog(cli.format)?, true),
    };

    emit(&report, cli.output.as_ref())?;
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn emit(report: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(event = "report.written", path = %path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}

fn render_suite(suite: &SuiteResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_suite_result(suite),
        OutputFormat::Json => to_json(suite).context("Failed to serialize suite result")?,
        OutputFormat::Markdown => render_suite_markdown(suite),
    })
}

fn render_single(result: &TestResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_test_result(result),
        OutputFormat::Json => to_json(result).context("Failed to serialize test result")?,
        OutputFormat::Markdown => format!("```text\n{}```\n", render_test_result(result)),
    })
}

fn render_plan(plan: &ScenarioPlan, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let value = json!({
            "applicable": plan.applicable,
            "skipped": plan.skipped,
        });
        return to_json(&value).context("Failed to serialize scenario plan");
    }

    let mut out = format!("Applicable ({}):\n", plan.applicable.len());
    for scenario in &plan.applicable {
        out.push_str(&format!("  {}\n", scenario));
    }
    out.push_str(&format!("Skipped ({}):\n", plan.skipped.len()));
    for skipped in &plan.skipped {
        out.push_str(&format!("  {}: {}\n", skipped.scenario, skipped.reason));
    }
    Ok(out)
}

fn render_catalog(format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let entries: Vec<_> = Scenario::ALL
            .iter()
            .map(|s| {
                json!({
                    "scenario": s,
                    "description": s.description(),
                    "required_tools": required_tools(*s),
                    "default": DEFAULT_SCENARIOS.contains(s),
                })
            })
            .collect();
        return to_json(&entries).context("Failed to serialize scenario catalog");
    }

    let mut out = String::new();
    for scenario in Scenario::ALL {
        let required = match required_tools(scenario) {
            Some(tools) => tools.join(", "),
            None => "(no implementation)".to_string(),
        };
        let marker = if DEFAULT_SCENARIOS.contains(&scenario) {
            ""
        } else {
            " [opt-in]"
        };
        out.push_str(&format!(
            "{:<28} {}{}\n    requires: {}\n",
            scenario.as_str(),
            scenario.description(),
            marker,
            required
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn test_run_with_repeated_scenarios() {
        let cli = parse(&[
            "adcp-harness",
            "run",
            "https://seller.example/mcp",
            "--scenario",
            "health_check",
            "--scenario",
            "create-media-buy",
            "--format",
            "markdown",
        ]);
        assert_eq!(cli.format, OutputFormat::Markdown);
        let Commands::Run { scenarios, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(scenarios, vec![Scenario::HealthCheck, Scenario::CreateMediaBuy]);
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        let err = Cli::try_parse_from(["adcp-harness", "scenario", "http://a", "warp_drive"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_agent_args_map_to_options() {
        let cli = parse(&[
            "adcp-harness",
            "scenario",
            "http://agent/a2a",
            "pricing_edge_cases",
            "--protocol",
            "a2a",
            "--dry-run",
            "no",
            "--budget",
            "250",
            "--channel",
            "ctv",
            "--pricing-model",
            "cpm",
        ]);
        let Commands::Scenario { scenario, agent, .. } = cli.command else {
            panic!("expected scenario");
        };
        assert_eq!(scenario, Scenario::PricingEdgeCases);

        let options = agent.into_options(Vec::new());
        assert_eq!(options.protocol, Some(Protocol::A2a));
        assert_eq!(options.dry_run, Some(false));
        assert_eq!(options.budget, Some(250.0));
        assert_eq!(options.channels, vec!["ctv".to_string()]);
        assert_eq!(options.pricing_models, vec!["cpm".to_string()]);
        assert!(options.scenarios.is_empty());
    }

    #[test]
    fn test_scenarios_preview() {
        let cli = parse(&["adcp-harness", "scenarios", "--tools", "get_products, create_media_buy"]);
        let Commands::Scenarios { tools } = cli.command else {
            panic!("expected scenarios");
        };
        let tools: BTreeSet<String> = tools.into_iter().map(|t| t.trim().to_string()).collect();
        let plan = plan_scenarios(&tools, None);
        let text = render_plan(&plan, OutputFormat::Text).expect("render");
        assert!(text.contains("  create_media_buy\n"));
        assert!(text.contains("signals_flow: agent does not expose: get_signals"));
    }

    #[test]
    fn test_catalog_listing() {
        let text = render_catalog(OutputFormat::Text).expect("render");
        assert!(text.contains("requires: get_products, create_media_buy"));
        assert!(text.contains("(no implementation)"));

        let json: serde_json::Value =
            serde_json::from_str(&render_catalog(OutputFormat::Json).expect("render"))
                .expect("json");
        assert_eq!(json.as_array().map(Vec::len), Some(Scenario::ALL.len()));
    }

    #[test]
    fn test_report_written_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.txt");
        emit("ok\n", Some(&path)).expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "ok\n");
    }
}
