//! AdCP Conformance Harness
//!
//! Discovers what an AdCP agent implements, runs the scenarios that apply to
//! it, and reports results as data. Agent misbehaviour is never an error:
//! it surfaces as failed steps inside a complete report.

pub mod catalog;
pub mod discovery;
pub mod error;
pub mod observer;
pub mod options;
pub mod orchestrator;
pub mod probes;
pub mod profile;
pub mod report;
pub mod result;
pub mod scenario;
pub mod scenarios;
pub mod step;

pub use catalog::{
    get_applicable_scenarios, is_applicable, missing_tools, plan_scenarios, required_tools,
    ScenarioPlan, SkippedScenario, DEFAULT_SCENARIOS,
};
pub use discovery::{discover_agent_profile, DiscoveryOutcome, DISCOVERY_STEP};
pub use error::{HarnessError, Result};
pub use observer::{run_span, NoopObserver, ProbeObserver, TracingObserver};
pub use options::{BrandReference, HarnessOptions, DEFAULT_BRIEF, DEFAULT_BUDGET};
pub use orchestrator::{scenario_fn, test_agent, test_all_scenarios, Harness, ScenarioFn};
pub use profile::{AgentProfile, ProtocolFamily};
pub use report::{
    render_suite_markdown, render_suite_result, render_test_result, to_json, write_suite_json,
};
pub use result::{StepResult, SuiteResult, TestResult};
pub use scenario::Scenario;
pub use step::run_step;
