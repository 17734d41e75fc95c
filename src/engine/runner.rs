//! 套件执行器
//!
//! 负责每个场景的生命周期：构建上下文 -> 执行 -> 归类结果 -> 落盘制品

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::core::config::HarnessConfig;
use crate::core::error::{HarnessError, Result};
use crate::core::event::{EventSender, HarnessEvent};
use crate::engine::context::ScenarioContext;
use crate::interfaces::Scenario;
use crate::report::artifacts::{Artifact, ArtifactRecorder};
use crate::report::sink::{Outcome, ReportSink};
use crate::report::summary::SuiteReport;

/// 套件执行器
///
/// 场景严格顺序执行，彼此之间不共享可变状态。
pub struct SuiteRunner {
    config: Arc<HarnessConfig>,
    sink: Arc<dyn ReportSink>,
    events: Option<EventSender>,
}

impl SuiteRunner {
    pub fn new(config: Arc<HarnessConfig>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            config,
            sink,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: HarnessEvent) {
        if let Some(ref sender) = self.events {
            sender.emit(event);
        }
    }

    /// 依次执行场景并汇总结果
    pub async fn run(&self, scenarios: &[Arc<dyn Scenario>]) -> Result<SuiteReport> {
        let started = Instant::now();
        let mut report = SuiteReport::new(self.config.api.base_url.clone());

        self.emit(HarnessEvent::SuiteStarted {
            base_url: self.config.api.base_url.clone(),
            total: scenarios.len(),
        });
        info!("目标: {}，共 {} 个场景", self.config.api.base_url, scenarios.len());

        for (index, scenario) in scenarios.iter().enumerate() {
            let id = scenario.id().to_string();
            self.emit(HarnessEvent::ScenarioStarted {
                index,
                id: id.clone(),
            });

            let scenario_started = Instant::now();
            let (outcome, artifacts) = self.execute(scenario.as_ref()).await;
            let elapsed = scenario_started.elapsed();

            match &outcome {
                Outcome::Passed => info!("[{}] 通过 ({:.2?})", id, elapsed),
                Outcome::Skipped(reason) => warn!("[{}] 跳过: {}", id, reason),
                Outcome::Failed(message) => error!("[{}] 失败: {}", id, message),
            }

            // 每个场景只落盘一次，落盘失败不影响后续场景
            if let Err(e) = self.sink.attach(&id, &outcome, artifacts).await {
                error!("[{}] 制品写入失败: {}", id, e);
            }

            report.record(&id, scenario.tags(), outcome.clone(), elapsed);
            self.emit(HarnessEvent::ScenarioFinished {
                index,
                id,
                outcome,
                elapsed,
            });
        }

        report.duration_ms = started.elapsed().as_millis();
        self.emit(HarnessEvent::SuiteFinished {
            passed: report.passed,
            failed: report.failed,
            skipped: report.skipped,
        });
        info!(
            "完成: {} 通过, {} 失败, {} 跳过 ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );

        self.sink.finalize(&report).await?;
        Ok(report)
    }

    /// 在全新的上下文中执行单个场景
    async fn execute(&self, scenario: &dyn Scenario) -> (Outcome, Vec<Artifact>) {
        let mut ctx = match ScenarioContext::new(self.config.clone()) {
            Ok(ctx) => ctx.with_events(self.events.clone()),
            Err(e) => {
                let mut artifacts = ArtifactRecorder::new();
                artifacts.add_text("error", &e);
                return (classify(&e), artifacts.into_artifacts());
            }
        };

        let result = scenario.run(&mut ctx).await;
        let mut artifacts = ctx.artifacts;

        let outcome = match result {
            Ok(()) => Outcome::Passed,
            Err(e) => {
                let outcome = classify(&e);
                if outcome.is_failed() {
                    artifacts.add_text("error", &e);
                }
                outcome
            }
        };
        (outcome, artifacts.into_artifacts())
    }
}

/// 错误归类：无法判定 → 跳过，其余 → 失败
pub fn classify(err: &HarnessError) -> Outcome {
    match err.skip_reason() {
        Some(reason) => Outcome::Skipped(reason.to_string()),
        None => Outcome::Failed(err.to_string()),
    }
}
