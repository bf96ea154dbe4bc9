use chrono::Utc;
use std::fmt::Write as _;
use std::path::Path;
use uuid::Uuid;

use crate::error::ReportError;
use crate::models::*;
use crate::orchestrator::RunMode;

/// Diff lines shown per failed endpoint in the console summary.
pub const MAX_DIFF_LINES: usize = 10;

pub struct Reporter;

impl Reporter {
    pub fn compute_counts(results: &[TestResult]) -> RunCounts {
        RunCounts {
            total: results.len(),
            passed: results.iter().filter(|r| r.matched).count(),
            failed: results.iter().filter(|r| r.is_failure()).count(),
            errors: results.iter().filter(|r| r.is_error()).count(),
        }
    }

    pub fn progress_line(index: usize, total: usize, result: &TestResult) -> String {
        let outcome = match &result.error {
            Some(error) => format!("ERROR: {}", error),
            None if result.matched => format!("OK ({:.0}ms)", result.duration_ms),
            None => format!("MISMATCH ({:.0}ms)", result.duration_ms),
        };
        format!("[{}/{}] {} {} ... {}", index, total, result.method, result.path, outcome)
    }

    pub fn print_progress(index: usize, total: usize, result: &TestResult) {
        println!("{}", Self::progress_line(index, total, result));
    }

    pub fn render_summary(results: &[TestResult]) -> String {
        let counts = Self::compute_counts(results);
        let rule = "=".repeat(60);
        let mut out = String::new();

        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "API Compatibility Test Summary");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total: {}", counts.total);
        let _ = writeln!(out, "  Passed:  {}", counts.passed);
        let _ = writeln!(out, "  Failed:  {}", counts.failed);
        let _ = writeln!(out, "  Errors:  {}", counts.errors);
        let _ = writeln!(out, "{}", rule);

        if counts.failed > 0 {
            let _ = writeln!(out, "\nFailed Endpoints:");
            for r in results.iter().filter(|r| r.is_failure()) {
                let _ = writeln!(out, "  - {} {} ({})", r.method, r.path, r.endpoint_id);
                for line in r.diff.iter().take(MAX_DIFF_LINES) {
                    let _ = writeln!(out, "      {}", line.trim_end());
                }
                if r.diff.len() > MAX_DIFF_LINES {
                    let _ = writeln!(out, "      ... {} more lines", r.diff.len() - MAX_DIFF_LINES);
                }
            }
        }

        if counts.errors > 0 {
            let _ = writeln!(out, "\nError Endpoints:");
            for r in results.iter().filter(|r| r.is_error()) {
                let _ = writeln!(out, "  - {} {}: {}", r.method, r.path, r.error.as_deref().unwrap_or_default());
            }
        }

        out
    }

    pub fn print_summary(results: &[TestResult]) {
        print!("{}", Self::render_summary(results));
    }

    pub fn build_report(results: &[TestResult], mode: RunMode, core_url: &str, legacy_url: &str) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            mode: mode.to_string(),
            core_url: core_url.to_string(),
            legacy_url: legacy_url.to_string(),
            counts: Self::compute_counts(results),
            results: results.iter().map(ResultSummary::from).collect(),
        }
    }

    pub fn export_json(report: &RunReport, output_path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(output_path, json).map_err(|source| ReportError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %output_path.display(), "run report written");
        Ok(())
    }

    pub fn export_csv(report: &RunReport, output_path: &Path) -> Result<(), ReportError> {
        let mut wtr = csv::Writer::from_path(output_path)?;

        wtr.write_record([
            "Endpoint", "HTTP Method", "Path", "Match", "Core Status",
            "Legacy Status", "Error", "Diff Lines", "Duration (ms)",
        ])?;

        for r in &report.results {
            wtr.write_record([
                r.id.as_str(),
                r.method.as_str(),
                r.path.as_str(),
                &r.matched.to_string(),
                &r.core_status.map_or(String::new(), |s| s.to_string()),
                &r.legacy_status.map_or(String::new(), |s| s.to_string()),
                r.error.as_deref().unwrap_or(""),
                &r.diff_lines.to_string(),
                &format!("{:.1}", r.duration_ms),
            ])?;
        }

        wtr.flush().map_err(|source| ReportError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn result(id: &str, matched: bool, error: Option<&str>, diff_len: usize) -> TestResult {
        TestResult {
            endpoint_id: id.to_string(),
            path: format!("/api/v1/{}", id),
            method: HttpMethod::Get,
            core_status: Some(200),
            legacy_status: None,
            core_response: None,
            legacy_response: None,
            matched,
            diff: (0..diff_len).map(|i| format!("+line {}", i)).collect(),
            error: error.map(str::to_string),
            duration_ms: 12.4,
        }
    }

    fn sample() -> Vec<TestResult> {
        vec![
            result("health", true, None, 0),
            result("rooms", false, None, 14),
            result("users", false, Some("No golden file found"), 0),
        ]
    }

    #[test]
    fn counts_split_failures_from_errors() {
        let counts = Reporter::compute_counts(&sample());
        assert_eq!(counts, RunCounts { total: 3, passed: 1, failed: 1, errors: 1 });
    }

    #[test]
    fn progress_lines() {
        let results = sample();
        assert_eq!(Reporter::progress_line(1, 3, &results[0]), "[1/3] GET /api/v1/health ... OK (12ms)");
        assert_eq!(Reporter::progress_line(2, 3, &results[1]), "[2/3] GET /api/v1/rooms ... MISMATCH (12ms)");
        assert_eq!(
            Reporter::progress_line(3, 3, &results[2]),
            "[3/3] GET /api/v1/users ... ERROR: No golden file found"
        );
    }

    #[test]
    fn summary_truncates_diff_to_ten_lines() {
        let text = Reporter::render_summary(&sample());
        assert!(text.contains("Passed:  1"));
        assert!(text.contains("+line 9"));
        assert!(!text.contains("+line 10"));
        assert!(text.contains("... 4 more lines"));
        assert!(text.contains("GET /api/v1/users: No golden file found"));
    }

    #[test]
    fn json_report_has_flat_counts_and_summaries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("results.json");
        let report = Reporter::build_report(&sample(), RunMode::CompareGolden, "http://core", "http://legacy");

        Reporter::export_json(&report, &path).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total"], 3);
        assert_eq!(written["errors"], 1);
        assert_eq!(written["mode"], "compare-golden");
        assert_eq!(written["core_url"], "http://core");
        assert_eq!(written["results"][1]["match"], false);
        assert_eq!(written["results"][1]["diff_lines"], 14);
        assert_eq!(written["results"][0]["legacy_status"], Value::Null);
        assert!(Uuid::parse_str(written["run_id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn csv_report_has_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("results.csv");
        let report = Reporter::build_report(&sample(), RunMode::Compare, "http://core", "http://legacy");

        Reporter::export_csv(&report, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Endpoint,HTTP Method,Path,Match"));
        assert!(lines[3].contains("No golden file found"));
    }
}
