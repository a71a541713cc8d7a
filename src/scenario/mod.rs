//! Scenario model and execution

mod runner;
mod spec;

pub use runner::{run_suite, Runner};
pub use spec::{
    Expect, Outcome, Scenario, ScenarioResult, ScenarioState, ScenarioStep, SuiteReport,
};
