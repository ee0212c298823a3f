//! Run scenarios against one agent and fold the results.
//!
//! A run is strictly sequential: discovery once, then each applicable
//! scenario in catalog order, each over a freshly connected client.

use adcp_client::{ClientFactory, HttpClientFactory};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::catalog::plan_scenarios;
use crate::discovery::{discover_agent_profile, DiscoveryOutcome, DISCOVERY_STEP};
use crate::observer::{run_span, NoopObserver, ProbeObserver, TracingObserver};
use crate::options::HarnessOptions;
use crate::profile::AgentProfile;
use crate::result::{StepResult, SuiteResult, TestResult};
use crate::scenario::Scenario;
use crate::scenarios::{
    behavior, capabilities, creatives, error_handling, governance, health, media_buy, pricing,
    product_discovery, si, signals, validation, ScenarioContext, ScenarioOutcome,
};
use crate::step::panic_message;

/// A scenario module entry point.
pub type ScenarioFn = fn(ScenarioContext) -> BoxFuture<'static, ScenarioOutcome>;

/// Module implementing `scenario`, if any.
pub fn scenario_fn(scenario: Scenario) -> Option<ScenarioFn> {
    let run: ScenarioFn = match scenario {
        Scenario::HealthCheck => |ctx: ScenarioContext| health::health_check(ctx).boxed(),
        Scenario::Discovery => |ctx: ScenarioContext| product_discovery::discovery(ctx).boxed(),
        Scenario::CreateMediaBuy => {
            |ctx: ScenarioContext| media_buy::create_media_buy(ctx).boxed()
        }
        Scenario::FullSalesFlow => |ctx: ScenarioContext| media_buy::full_sales_flow(ctx).boxed(),
        Scenario::CreativeSync => |ctx: ScenarioContext| creatives::creative_sync(ctx).boxed(),
        Scenario::CreativeInline => |ctx: ScenarioContext| creatives::creative_inline(ctx).boxed(),
        Scenario::CreativeReference => return None,
        Scenario::PricingEdgeCases => {
            |ctx: ScenarioContext| pricing::pricing_edge_cases(ctx).boxed()
        }
        Scenario::ErrorHandling => {
            |ctx: ScenarioContext| error_handling::error_handling(ctx).boxed()
        }
        Scenario::Validation => |ctx: ScenarioContext| validation::validation(ctx).boxed(),
        Scenario::TemporalValidation => {
            |ctx: ScenarioContext| validation::temporal_validation(ctx).boxed()
        }
        Scenario::BehaviorAnalysis => {
            |ctx: ScenarioContext| behavior::behavior_analysis(ctx).boxed()
        }
        Scenario::ResponseConsistency => {
            |ctx: ScenarioContext| behavior::response_consistency(ctx).boxed()
        }
        Scenario::CreativeFlow => |ctx: ScenarioContext| creatives::creative_flow(ctx).boxed(),
        Scenario::SignalsFlow => |ctx: ScenarioContext| signals::signals_flow(ctx).boxed(),
        Scenario::GovernancePropertyLists => {
            |ctx: ScenarioContext| governance::governance_property_lists(ctx).boxed()
        }
        Scenario::GovernanceContentStandards => {
            |ctx: ScenarioContext| governance::governance_content_standards(ctx).boxed()
        }
        Scenario::SiSessionLifecycle => {
            |ctx: ScenarioContext| si::si_session_lifecycle(ctx).boxed()
        }
        Scenario::SiAvailability => |ctx: ScenarioContext| si::si_availability(ctx).boxed(),
        Scenario::CapabilityDiscovery => {
            |ctx: ScenarioContext| capabilities::capability_discovery(ctx).boxed()
        }
    };
    Some(run)
}

/// Entry point for conformance runs.
///
/// Holds the client factory (one client per scenario) and the observer that
/// receives lifecycle events. Cheap to clone.
#[derive(Clone)]
pub struct Harness {
    factory: Arc<dyn ClientFactory>,
    observer: Arc<dyn ProbeObserver>,
}

impl Harness {
    /// Harness over `factory` that reports to nobody.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Real HTTP transports, events emitted through `tracing`.
    pub fn http() -> Self {
        Self::new(Arc::new(HttpClientFactory)).with_observer(Arc::new(TracingObserver))
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProbeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run a single scenario, preceded by capability discovery.
    ///
    /// The discovery step is the first step of the result. A scenario with
    /// no module yields one synthetic failed step and no agent traffic.
    pub async fn test_agent(
        &self,
        agent_url: &str,
        scenario: Scenario,
        options: &HarnessOptions,
    ) -> TestResult {
        let options = options.effective();
        let span = run_span(options.session_id.as_deref().unwrap_or_default(), agent_url);
        self.single(agent_url, scenario, options).instrument(span).await
    }

    async fn single(&self, agent_url: &str, scenario: Scenario, options: HarnessOptions) -> TestResult {
        let start = Instant::now();
        let dry_run = options.is_dry_run();

        let Some(run) = scenario_fn(scenario) else {
            let step = StepResult::synthetic_failure(
                "Dispatch scenario",
                format!("no implementation registered for scenario '{}'", scenario),
            );
            self.observer.step_finished(Some(scenario), &step);
            let result = TestResult::new(
                agent_url,
                scenario,
                vec![step],
                None,
                dry_run,
                elapsed_ms(start),
            );
            self.observer.scenario_finished(&result);
            return result;
        };

        let discovery = self.discover(agent_url, &options).await;
        let Some(profile) = discovery.profile else {
            let result = TestResult::new(
                agent_url,
                scenario,
                vec![discovery.step],
                None,
                dry_run,
                elapsed_ms(start),
            );
            self.observer.scenario_finished(&result);
            return result;
        };

        let outcome = self
            .execute(agent_url, scenario, run, &options, &profile)
            .await;
        let mut steps = Vec::with_capacity(outcome.steps.len() + 1);
        steps.push(discovery.step);
        steps.extend(outcome.steps);

        let result = TestResult::new(
            agent_url,
            scenario,
            steps,
            Some(outcome.profile.unwrap_or(profile)),
            dry_run,
            elapsed_ms(start),
        );
        self.observer.scenario_finished(&result);
        result
    }

    /// Discover, plan, then run every applicable scenario in order.
    ///
    /// Never fails: an agent that cannot be introspected yields an empty,
    /// failed suite carrying the discovery error.
    pub async fn test_all_scenarios(&self, agent_url: &str, options: &HarnessOptions) -> SuiteResult {
        let options = options.effective();
        let span = run_span(options.session_id.as_deref().unwrap_or_default(), agent_url);
        self.suite(agent_url, options).instrument(span).await
    }

    async fn suite(&self, agent_url: &str, options: HarnessOptions) -> SuiteResult {
        let start = Instant::now();
        let dry_run = options.is_dry_run();

        let discovery = self.discover(agent_url, &options).await;
        let Some(mut profile) = discovery.profile else {
            let error = discovery
                .step
                .error
                .unwrap_or_else(|| "capability discovery failed".to_string());
            let suite = SuiteResult::discovery_failed(agent_url, error, dry_run, elapsed_ms(start));
            self.observer.suite_finished(&suite);
            return suite;
        };

        let plan = plan_scenarios(&profile.tools, options.scenario_allow_list());
        for skipped in &plan.skipped {
            self.observer.scenario_skipped(skipped);
        }

        let mut results = Vec::with_capacity(plan.applicable.len());
        for scenario in plan.applicable {
            let scenario_start = Instant::now();
            let outcome = match scenario_fn(scenario) {
                Some(run) => {
                    self.execute(agent_url, scenario, run, &options, &profile)
                        .await
                }
                None => ScenarioOutcome {
                    steps: vec![StepResult::synthetic_failure(
                        "Dispatch scenario",
                        format!("no implementation registered for scenario '{}'", scenario),
                    )],
                    profile: None,
                },
            };
            if let Some(enriched) = outcome.profile {
                profile.merge(enriched);
            }
            let result = TestResult::new(
                agent_url,
                scenario,
                outcome.steps,
                Some(profile.clone()),
                dry_run,
                elapsed_ms(scenario_start),
            );
            self.observer.scenario_finished(&result);
            results.push(result);
        }

        let suite = SuiteResult::from_results(
            agent_url,
            profile,
            results,
            plan.skipped,
            dry_run,
            elapsed_ms(start),
        );
        self.observer.suite_finished(&suite);
        suite
    }

    async fn discover(&self, agent_url: &str, options: &HarnessOptions) -> DiscoveryOutcome {
        let outcome = match self.factory.connect(agent_url, &options.client_options()) {
            Ok(client) => discover_agent_profile(client.as_ref(), options).await,
            Err(err) => DiscoveryOutcome {
                profile: None,
                step: StepResult::synthetic_failure(
                    DISCOVERY_STEP,
                    format!("cannot connect to agent: {}", err),
                ),
            },
        };
        self.observer.discovery_finished(agent_url, &outcome.step);
        outcome
    }

    /// Run one scenario module over its own client.
    async fn execute(
        &self,
        agent_url: &str,
        scenario: Scenario,
        run: ScenarioFn,
        options: &HarnessOptions,
        profile: &AgentProfile,
    ) -> ScenarioOutcome {
        self.observer.scenario_started(scenario);

        let client = match self.factory.connect(agent_url, &options.client_options()) {
            Ok(client) => client,
            Err(err) => {
                return self.aborted(scenario, "Connect to agent", format!("{}", err));
            }
        };
        let ctx = ScenarioContext::new(
            scenario,
            client,
            options.clone(),
            profile.clone(),
            self.observer.clone(),
        );
        match AssertUnwindSafe(run(ctx)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => self.aborted(
                scenario,
                "Scenario aborted",
                format!("scenario panicked: {}", panic_message(payload.as_ref())),
            ),
        }
    }

    fn aborted(&self, scenario: Scenario, step: &str, error: String) -> ScenarioOutcome {
        let step = StepResult::synthetic_failure(step, error);
        self.observer.step_finished(Some(scenario), &step);
        ScenarioOutcome {
            steps: vec![step],
            profile: None,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::http()
    }
}

/// [`Harness::test_agent`] over real HTTP transports.
pub async fn test_agent(agent_url: &str, scenario: Scenario, options: &HarnessOptions) -> TestResult {
    Harness::http().test_agent(agent_url, scenario, options).await
}

/// [`Harness::test_all_scenarios`] over real HTTP transports.
pub async fn test_all_scenarios(agent_url: &str, options: &HarnessOptions) -> SuiteResult {
    Harness::http().test_all_scenarios(agent_url, options).await
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
