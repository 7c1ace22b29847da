//! Main scenario runner: one fresh session per scenario, results to JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::{FormProfile, SessionConfig};
use crate::error::{E2eError, E2eResult};
use crate::form;
use crate::outcome::{self, Outcome};
use crate::session::{Launcher, Session, WebDriverLauncher};
use crate::spec::Scenario;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub outcome: Option<Outcome>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub session: SessionConfig,
    pub profile: FormProfile,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            profile: FormProfile::default(),
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Runs scenarios serially against the form
pub struct TestRunner<L: Launcher> {
    launcher: L,
    profile: FormProfile,
    scenarios_dir: PathBuf,
    output_dir: PathBuf,
}

impl TestRunner<WebDriverLauncher> {
    /// Create a runner that launches real browser sessions
    pub fn with_config(config: RunnerConfig) -> Self {
        Self::new(
            WebDriverLauncher::new(config.session),
            config.profile,
            config.scenarios_dir,
            config.output_dir,
        )
    }
}

impl<L: Launcher> TestRunner<L> {
    pub fn new(
        launcher: L,
        profile: FormProfile,
        scenarios_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            launcher,
            profile,
            scenarios_dir,
            output_dir,
        }
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.scenarios_dir)?;
        Ok(self.run_scenarios(&scenarios).await)
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.scenarios_dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        Ok(self.run_scenarios(&filtered).await)
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.scenarios_dir)?;
        let scenario = scenarios
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;
        Ok(self.run_scenarios(std::slice::from_ref(&scenario)).await)
    }

    /// Run a list of scenarios; a failing one never stops the rest
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        SuiteResult {
            started_at,
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario in its own session
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let (outcome, checked) = match self.launcher.launch(&self.profile.url).await {
            Ok(session) => {
                let observed = self.exercise(&session, scenario).await;
                session.close().await;
                match observed {
                    Ok(outcome) => {
                        let checked = scenario.expect.verify(&outcome, &self.profile.messages);
                        (Some(outcome), checked)
                    }
                    Err(e) => (None, Err(e)),
                }
            }
            Err(e) => (None, Err(e)),
        };

        ScenarioResult {
            name: scenario.name.clone(),
            success: checked.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            outcome,
            error: checked.err().map(|e| e.to_string()),
        }
    }

    /// Submit the scenario's values and classify what the form did
    async fn exercise(
        &self,
        session: &Session<L::Driver>,
        scenario: &Scenario,
    ) -> E2eResult<Outcome> {
        let choice = scenario.choice.as_deref().unwrap_or(&self.profile.choice);
        let sections = form::submit(session, &self.profile, choice, &scenario.fields).await?;
        outcome::classify(session, &self.profile, &sections, scenario.expect.field()).await
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
