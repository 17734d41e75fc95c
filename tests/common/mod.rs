#![allow(dead_code)]

use std::sync::Arc;

use jobprobe::core::config::{ApiConfig, HarnessConfig, PollConfig};
use jobprobe::interfaces::Scenario;
use jobprobe::report::{Artifact, MemorySink, Outcome, SuiteReport};
use jobprobe::engine::SuiteRunner;
use jobprobe::scenarios::ScenarioRegistry;

pub const TOKEN: &str = "secret-token";

pub fn config(base_url: &str) -> HarnessConfig {
    HarnessConfig::builder()
        .api(ApiConfig::builder().base_url(base_url).token(TOKEN).build())
        .poll(PollConfig::builder().interval_ms(20).deadline_secs(1).build())
        .build()
}

pub fn scenario(id: &str) -> Arc<dyn Scenario> {
    ScenarioRegistry::standard()
        .get(id)
        .unwrap_or_else(|| panic!("unknown scenario {id}"))
}

/// 在内存输出端上执行指定场景
pub async fn run(base_url: &str, ids: &[&str]) -> (SuiteReport, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let scenarios: Vec<_> = ids.iter().map(|id| scenario(id)).collect();
    let report = SuiteRunner::new(Arc::new(config(base_url)), sink.clone())
        .run(&scenarios)
        .await
        .expect("runner");
    (report, sink)
}

pub fn outcome(sink: &MemorySink, id: &str) -> (Outcome, Vec<Artifact>) {
    sink.get(id).unwrap_or_else(|| panic!("no entry for {id}"))
}

pub fn artifact_names(artifacts: &[Artifact]) -> Vec<&str> {
    artifacts.iter().map(|a| a.name.as_str()).collect()
}
