use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::diff::{DiffLabels, Differ};
use crate::error::{ConfigError, EndpointFailure};
use crate::executor::{Exchange, RequestExecutor};
use crate::golden::GoldenStore;
use crate::models::{EndpointDefinition, Server, TestResult};
use crate::normalize::{normalize, IgnoreList};

/// Statuses whose bodies may become golden snapshots.
const SAVEABLE_STATUS: [u16; 2] = [200, 201];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    #[default]
    Compare,
    CoreOnly,
    SaveGolden,
    CompareGolden,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Compare => "compare",
            RunMode::CoreOnly => "core-only",
            RunMode::SaveGolden => "save-golden",
            RunMode::CompareGolden => "compare-golden",
        }
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "compare" => Ok(RunMode::Compare),
            "core-only" => Ok(RunMode::CoreOnly),
            "save-golden" => Ok(RunMode::SaveGolden),
            "compare-golden" => Ok(RunMode::CompareGolden),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What actually happens for one endpoint: the endpoint's override wins over
/// the run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    SingleTarget(Server),
    CoreOnly,
    SaveGolden,
    CompareGolden,
    Compare,
}

impl Dispatch {
    pub fn resolve(endpoint: &EndpointDefinition, mode: RunMode) -> Self {
        if let Some(pinned) = endpoint.mode_override {
            return Dispatch::SingleTarget(pinned.server());
        }
        match mode {
            RunMode::CoreOnly => Dispatch::CoreOnly,
            RunMode::SaveGolden => Dispatch::SaveGolden,
            RunMode::CompareGolden => Dispatch::CompareGolden,
            RunMode::Compare => Dispatch::Compare,
        }
    }
}

pub struct TestOrchestrator {
    executor: RequestExecutor,
    golden: GoldenStore,
    ignore: IgnoreList,
    mode: RunMode,
}

impl TestOrchestrator {
    pub fn new(executor: RequestExecutor, golden: GoldenStore, ignore: IgnoreList, mode: RunMode) -> Self {
        TestOrchestrator {
            executor,
            golden,
            ignore,
            mode,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Runs endpoints one at a time in manifest order. A non-empty `filter`
    /// restricts the run to the listed ids. `on_result` sees each result as
    /// it completes, with its 1-based position.
    pub async fn run_tests<F>(
        &mut self,
        endpoints: &[EndpointDefinition],
        filter: &[String],
        mut on_result: F,
    ) -> Vec<TestResult>
    where
        F: FnMut(usize, usize, &TestResult),
    {
        let selected: Vec<&EndpointDefinition> = endpoints
            .iter()
            .filter(|ep| filter.is_empty() || filter.contains(&ep.id))
            .collect();
        let total = selected.len();
        tracing::info!(mode = %self.mode, total, "starting run");

        let mut results = Vec::with_capacity(total);
        for (i, endpoint) in selected.into_iter().enumerate() {
            let result = self.test_endpoint(endpoint).await;
            on_result(i + 1, total, &result);
            results.push(result);
        }
        results
    }

    pub async fn test_endpoint(&mut self, endpoint: &EndpointDefinition) -> TestResult {
        let start = Instant::now();
        let mut result = TestResult {
            endpoint_id: endpoint.id.clone(),
            path: endpoint.path.clone(),
            method: endpoint.method,
            core_status: None,
            legacy_status: None,
            core_response: None,
            legacy_response: None,
            matched: false,
            diff: Vec::new(),
            error: None,
            duration_ms: 0.0,
        };

        match Dispatch::resolve(endpoint, self.mode) {
            Dispatch::SingleTarget(server) => {
                let exchange = self.executor.execute(endpoint, server).await;
                result.matched = endpoint.expects(exchange.status);
                self.record(&mut result, server, &exchange);
            }
            Dispatch::CoreOnly => {
                let core = self.executor.execute(endpoint, Server::Core).await;
                result.matched = endpoint.expects(core.status);
                self.record(&mut result, Server::Core, &core);
            }
            Dispatch::SaveGolden => {
                let core = self.executor.execute(endpoint, Server::Core).await;
                self.record(&mut result, Server::Core, &core);
                match self.save_golden(endpoint, &core) {
                    Ok(()) => result.matched = true,
                    Err(failure) => result.error = Some(failure.to_string()),
                }
            }
            Dispatch::CompareGolden => {
                let core = self.executor.execute(endpoint, Server::Core).await;
                self.record(&mut result, Server::Core, &core);
                match self.golden.load(&endpoint.id) {
                    Ok(Some(golden)) => {
                        let cmp = Differ::new(&self.ignore).compare(
                            Some(&golden),
                            core.body.as_ref(),
                            DiffLabels::GOLDEN_VS_CORE,
                        );
                        result.matched = cmp.matched;
                        result.diff = cmp.diff;
                    }
                    Ok(None) => result.error = Some(EndpointFailure::GoldenMissing.to_string()),
                    Err(e) => {
                        tracing::error!(endpoint = %endpoint.id, error = %e, "failed to load golden snapshot");
                        result.error = Some(EndpointFailure::GoldenStore(e).to_string());
                    }
                }
            }
            Dispatch::Compare => {
                let core = self.executor.execute(endpoint, Server::Core).await;
                let legacy = self.executor.execute(endpoint, Server::Legacy).await;
                self.record(&mut result, Server::Core, &core);
                self.record(&mut result, Server::Legacy, &legacy);

                if core.status != legacy.status {
                    let failure = EndpointFailure::StatusMismatch {
                        core: core.status,
                        legacy: legacy.status,
                    };
                    result.error = Some(failure.to_string());
                } else {
                    let cmp = Differ::new(&self.ignore).compare(
                        legacy.body.as_ref(),
                        core.body.as_ref(),
                        DiffLabels::LEGACY_VS_CORE,
                    );
                    result.matched = cmp.matched;
                    result.diff = cmp.diff;
                }
            }
        }

        result.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        result
    }

    fn save_golden(&self, endpoint: &EndpointDefinition, core: &Exchange) -> Result<(), EndpointFailure> {
        if !SAVEABLE_STATUS.contains(&core.status) {
            return Err(EndpointFailure::NotSaveable(core.status));
        }
        let snapshot = normalize(core.body.as_ref(), &self.ignore);
        self.golden.save(&endpoint.id, &snapshot).map_err(|e| {
            tracing::error!(endpoint = %endpoint.id, error = %e, "failed to write golden snapshot");
            EndpointFailure::from(e)
        })
    }

    fn record(&self, result: &mut TestResult, server: Server, exchange: &Exchange) {
        let normalized: Value = normalize(exchange.body.as_ref(), &self.ignore);
        match server {
            Server::Core => {
                result.core_status = Some(exchange.status);
                result.core_response = Some(normalized);
            }
            Server::Legacy => {
                result.legacy_status = Some(exchange.status);
                result.legacy_response = Some(normalized);
            }
        }
    }
}
