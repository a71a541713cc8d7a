//! CLI command definitions and dispatch

use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::fixtures::FixtureRepository;
use crate::scenario::run_suite;
use crate::suite;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the conformance suite against a registry
    Run {
        /// host:port of the registry's MLLP listener (overrides config)
        #[arg(long)]
        target: Option<String>,

        /// Fixture directory (overrides config)
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Run only the named scenario (e.g. OHIE-CR-02); repeatable
        #[arg(long = "scenario", short = 's')]
        scenarios: Vec<String>,

        /// Skip the suite-wide setup step
        #[arg(long)]
        no_precondition: bool,
    },

    /// List the built-in scenarios
    List,

    /// Parse every fixture the suite references, without connecting
    Check {
        /// Fixture directory (overrides config)
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run {
            target,
            fixtures,
            scenarios,
            no_precondition,
        } => {
            let address = target.unwrap_or(config.target.address.clone());
            let fixture_dir = fixtures.unwrap_or(config.fixtures.dir.clone());

            let selected = suite::select(&scenarios);
            if selected.is_empty() {
                return Err(Error::Config(format!(
                    "no scenario matches {scenarios:?}; see 'cr-harness list'"
                )));
            }

            let precondition = (!no_precondition).then_some(suite::PRECONDITION_STEP);
            let report = run_suite(
                &address,
                &config.timeouts,
                FixtureRepository::new(fixture_dir),
                config.domain_table(),
                precondition,
                &selected,
            )
            .await?;

            if report.failed() > 0 {
                return Err(Error::SuiteFailed {
                    failed: report.failed(),
                    total: report.results.len(),
                });
            }
            Ok(())
        }

        Commands::List => {
            for scenario in suite::scenarios() {
                let status = if scenario.is_pending() {
                    "pending".yellow().to_string()
                } else {
                    format!("{} step(s)", scenario.steps.len())
                };
                println!("{}  {}", scenario.id.bold(), status.dimmed());
                println!("    {}", scenario.description);
            }
            Ok(())
        }

        Commands::Check { fixtures } => {
            let fixture_dir = fixtures.unwrap_or(config.fixtures.dir.clone());
            let repo = FixtureRepository::new(&fixture_dir);

            let mut step_ids = vec![suite::PRECONDITION_STEP.to_string()];
            for scenario in suite::scenarios() {
                for step in &scenario.steps {
                    step_ids.push(step.fixture.clone());
                }
            }

            let mut bad = 0;
            for id in &step_ids {
                match repo.load(id) {
                    Ok(_) => println!("  {} {}", "✓".green(), id.dimmed()),
                    Err(e) => {
                        bad += 1;
                        println!("  {} {}: {}", "✗".red(), id, e);
                    }
                }
            }

            if bad > 0 {
                return Err(Error::Config(format!(
                    "{bad} of {} fixtures failed to load from {}",
                    step_ids.len(),
                    fixture_dir.display()
                )));
            }
            println!("{} fixtures OK", step_ids.len());
            Ok(())
        }
    }
}
