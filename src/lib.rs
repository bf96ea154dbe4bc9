pub mod models;
pub mod error;
pub mod config;
pub mod logging;
pub mod manifest;
pub mod api_client;
pub mod auth;
pub mod executor;
pub mod normalize;
pub mod diff;
pub mod golden;
pub mod orchestrator;
pub mod report;

use api_client::ApiClient;
use auth::TokenCache;
use config::CompatConfig;
use error::CompatError;
use executor::RequestExecutor;
use golden::GoldenStore;
use manifest::{Manifest, ManifestStore};
use models::{RunReport, Server, TestResult};
use orchestrator::TestOrchestrator;
use report::Reporter;

pub struct RunOutcome {
    pub results: Vec<TestResult>,
    pub report: RunReport,
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.matched)
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_failures() { 1 } else { 0 }
    }
}

/// Loads the manifest (falling back to built-in endpoints), runs every selected
/// endpoint in sequence, prints the console summary and writes the report.
pub async fn run(config: &CompatConfig) -> Result<RunOutcome, CompatError> {
    let store = ManifestStore::new(&config.manifest_path);
    let manifest = store.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load manifest, using default endpoints");
        Manifest::fallback()
    });
    println!("Loaded {} endpoints from manifest", manifest.endpoints.len());

    let core = ApiClient::new(Server::Core, &config.core_url, &config.timeouts)?;
    let legacy = ApiClient::new(Server::Legacy, &config.legacy_url, &config.timeouts)?;
    let mut executor = RequestExecutor::new(core, legacy, TokenCache::new(manifest.test_accounts));

    if config.setup_data {
        println!("Setting up test data...");
        match executor.setup_test_data(Server::Core).await {
            Ok(status) => println!("Test data created successfully (status {})", status),
            Err(e) => {
                tracing::warn!(error = %e, "test data setup failed");
                println!("Warning: Failed to create test data");
            }
        }
    }

    let golden = GoldenStore::new(&config.golden_dir);
    let mut orchestrator = TestOrchestrator::new(executor, golden, manifest.ignore_fields, config.mode);

    println!("\nRunning tests in '{}' mode...", config.mode);
    println!("{}", "-".repeat(60));
    let results = orchestrator
        .run_tests(&manifest.endpoints, &config.filter, Reporter::print_progress)
        .await;

    Reporter::print_summary(&results);
    let report = Reporter::build_report(&results, config.mode, &config.core_url, &config.legacy_url);
    Reporter::export_json(&report, &config.output_path)?;
    println!("\nResults saved to {}", config.output_path.display());
    if let Some(csv_path) = &config.csv_output_path {
        Reporter::export_csv(&report, csv_path)?;
    }

    Ok(RunOutcome { results, report })
}
