use std::time::Duration;

use serde::Serialize;

use crate::report::sink::Outcome;

/// 单个场景的执行记录
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRecord {
    pub id: String,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub duration_ms: u128,
}

/// 套件执行摘要
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u128,
    pub scenarios: Vec<ScenarioRecord>,
}

impl SuiteReport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, id: &str, tags: &[&str], outcome: Outcome, elapsed: Duration) {
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
        self.total += 1;
        self.scenarios.push(ScenarioRecord {
            id: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            outcome,
            duration_ms: elapsed.as_millis(),
        });
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn outcome_of(&self, id: &str) -> Option<&Outcome> {
        self.scenarios.iter().find(|s| s.id == id).map(|s| &s.outcome)
    }
}
