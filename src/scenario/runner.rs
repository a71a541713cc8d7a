//! Scenario execution
//!
//! Drives load → send → navigate → assert for the ordered steps of a
//! scenario, short-circuiting at the first failed assertion or
//! transport fault. Later steps are not attempted: their fixtures may
//! assume registry state produced by earlier accepted steps.

use colored::Colorize;

use crate::assertions;
use crate::common::{Error, Result};
use crate::fixtures::FixtureRepository;
use crate::hl7::{navigate, DomainTable, Message};
use crate::mllp::MllpClient;

use super::spec::{
    Expect, Outcome, Scenario, ScenarioResult, ScenarioState, ScenarioStep, SuiteReport,
};

/// Executes scenarios over one registry connection
pub struct Runner {
    client: MllpClient,
    fixtures: FixtureRepository,
    domains: DomainTable,
}

impl Runner {
    pub fn new(client: MllpClient, fixtures: FixtureRepository, domains: DomainTable) -> Self {
        Self {
            client,
            fixtures,
            domains,
        }
    }

    /// Run the one-time setup step gating the scenario set
    ///
    /// The step must be accepted by the registry; a failure here fails
    /// the whole run and no scenario is attempted.
    pub async fn run_precondition(&mut self, step_id: &str) -> Result<()> {
        tracing::info!(step = step_id, "running suite precondition");
        let request = self.fixtures.load(step_id)?;
        let response = self.client.send(&request).await?;
        assertions::assert_accepted(&response)
            .map_err(|e| Error::Assertion(format!("precondition {step_id}: {e}")))?;
        println!("  {} {} {}", "✓".green(), "precondition".cyan(), step_id.dimmed());
        Ok(())
    }

    /// Run one scenario to a terminal state
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioResult {
        println!(
            "\n{} {}",
            "Scenario:".blue().bold(),
            scenario.id.white().bold()
        );
        println!("  {}", scenario.description.dimmed());

        if scenario.is_pending() {
            println!("  {} {}", "…".yellow(), "pending (no steps defined)".yellow());
            return ScenarioResult {
                id: scenario.id.clone(),
                steps_run: 0,
                steps_total: 0,
                outcome: Outcome::Pending,
            };
        }

        let mut state = ScenarioState::NotStarted;
        for (index, step) in scenario.steps.iter().enumerate() {
            state = ScenarioState::Running(index);
            match self.run_step(step).await {
                Ok(()) => {
                    println!("  {} {}", "✓".green(), step.fixture.dimmed());
                }
                Err(e) => {
                    println!("  {} {}: {}", "✗".red(), step.fixture, e);
                    state = ScenarioState::Failed {
                        step: index,
                        reason: e.to_string(),
                    };
                    break;
                }
            }
        }

        let (steps_run, outcome) = match state {
            ScenarioState::Failed { step, reason } => (
                step + 1,
                Outcome::Failed {
                    step_index: step,
                    step_id: scenario.steps[step].fixture.clone(),
                    reason,
                },
            ),
            _ => (scenario.steps.len(), Outcome::Passed),
        };

        ScenarioResult {
            id: scenario.id.clone(),
            steps_run,
            steps_total: scenario.steps.len(),
            outcome,
        }
    }

    async fn run_step(&mut self, step: &ScenarioStep) -> Result<()> {
        let request = self.fixtures.load(&step.fixture)?;
        let response = self.client.send(&request).await?;
        for expect in &step.expect {
            self.check(expect, &response)?;
        }
        Ok(())
    }

    fn check(&self, expect: &Expect, response: &Message) -> Result<()> {
        match expect {
            Expect::Accepted => assertions::assert_accepted(response),
            Expect::Rejected => assertions::assert_rejected(response),
            Expect::MessageTypeVersion {
                message_type,
                trigger_event,
                structure,
                version,
            } => assertions::assert_message_type_version(
                response,
                message_type,
                trigger_event,
                structure.as_deref(),
                version,
            ),
            Expect::ReceivingFacility {
                application,
                facility,
            } => assertions::assert_receiving_facility(response, application, facility),
            Expect::HasErr => assertions::assert_has_err(response),
            Expect::OneQueryResult => assertions::assert_has_one_query_result(response),
            Expect::Pid3Containing {
                path,
                id,
                namespace,
                universal_id,
            } => {
                let segment = navigate(response, path)?;
                assertions::assert_pid3_containing(
                    segment,
                    id,
                    namespace,
                    universal_id,
                    &self.domains,
                )
            }
        }
    }

    /// Close the registry connection
    pub async fn shutdown(self) -> Result<()> {
        self.client.shutdown().await
    }
}

/// Connect, satisfy the precondition, and run the given scenarios
///
/// The connection is closed on every exit path. Scenario failures are
/// collected into the report, not raised; only infrastructure faults
/// (connect, precondition) surface as errors.
pub async fn run_suite(
    address: &str,
    timeouts: &crate::common::config::Timeouts,
    fixtures: FixtureRepository,
    domains: DomainTable,
    precondition: Option<&str>,
    scenarios: &[Scenario],
) -> Result<SuiteReport> {
    let client = MllpClient::connect(address, timeouts).await?;
    let mut runner = Runner::new(client, fixtures, domains);

    if let Some(step_id) = precondition {
        if let Err(e) = runner.run_precondition(step_id).await {
            let _ = runner.shutdown().await;
            return Err(e);
        }
    }

    let mut report = SuiteReport::default();
    for scenario in scenarios {
        let result = runner.run_scenario(scenario).await;
        report.results.push(result);
    }

    runner.shutdown().await?;

    println!(
        "\n{} passed, {} failed, {} pending",
        report.passed().to_string().green(),
        report.failed().to_string().red(),
        report.pending().to_string().yellow()
    );

    Ok(report)
}
