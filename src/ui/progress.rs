//! 终端进度渲染 (Terminal UI Progress)
//!
//! 基于 `indicatif` 渲染套件进度，日志经由同一个 `MultiProgress` 输出，避免破坏进度条布局。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::core::event::{EventReceiver, HarnessEvent};
use crate::report::sink::Outcome;
use crate::utils::ellipsize;

/// 全局 TUI 容器 (Singleton)
static MULTI: OnceLock<MultiProgress> = OnceLock::new();

/// 获取全局进度容器实例
pub fn get_multi() -> &'static MultiProgress {
    MULTI.get_or_init(MultiProgress::new)
}

/// TUI 状态容器
struct UiState {
    /// 套件总进度
    suite_bar: Option<ProgressBar>,
    /// 当前场景 (含轮询状态)
    scenario_bar: Option<ProgressBar>,
}

static STATE: OnceLock<Arc<RwLock<UiState>>> = OnceLock::new();

fn get_state() -> &'static Arc<RwLock<UiState>> {
    STATE.get_or_init(|| {
        Arc::new(RwLock::new(UiState {
            suite_bar: None,
            scenario_bar: None,
        }))
    })
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// 进度协调器
pub struct Ui;

impl Ui {
    /// 启动事件监听循环，发送端全部释放后退出
    pub fn run(receiver: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv_async().await {
                Self::handle_event(event);
            }
        })
    }

    fn handle_event(event: HarnessEvent) {
        let multi = get_multi();
        let mut ui = get_state().write();

        match event {
            HarnessEvent::SuiteStarted { base_url, total } => {
                let bar = multi.add(ProgressBar::new(total as u64));
                bar.set_style(
                    style("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .progress_chars("█▉▊▋▌▍▎▏  "),
                );
                bar.set_message(base_url);
                ui.suite_bar = Some(bar);
            }
            HarnessEvent::ScenarioStarted { id, .. } => {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style("{spinner:.green} [{elapsed_precise}] {msg}").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
                bar.set_message(id);
                bar.enable_steady_tick(Duration::from_millis(100));
                ui.scenario_bar = Some(bar);
            }
            HarnessEvent::PollProgress {
                job_id,
                attempt,
                status,
            } => {
                if let Some(ref bar) = ui.scenario_bar {
                    bar.set_message(format!(
                        "⏳ job {} #{}: {}",
                        ellipsize(&job_id, 24),
                        attempt,
                        status.as_deref().unwrap_or("?")
                    ));
                }
            }
            HarnessEvent::ScenarioFinished {
                id, outcome, elapsed, ..
            } => {
                if let Some(bar) = ui.scenario_bar.take() {
                    let line = match &outcome {
                        Outcome::Passed => format!("✅ {} ({:.2?})", id, elapsed),
                        Outcome::Skipped(reason) => format!("⏭️ {}: {}", id, ellipsize(reason, 80)),
                        Outcome::Failed(message) => format!("❌ {}: {}", id, ellipsize(message, 80)),
                    };
                    bar.finish_and_clear();
                    let _ = multi.println(line);
                }
                if let Some(ref bar) = ui.suite_bar {
                    bar.inc(1);
                }
            }
            HarnessEvent::SuiteFinished {
                passed,
                failed,
                skipped,
            } => {
                if let Some(bar) = ui.suite_bar.take() {
                    let summary = format!("{} passed, {} failed, {} skipped", passed, failed, skipped);
                    if failed > 0 {
                        bar.abandon_with_message(format!("❌ {}", summary));
                    } else {
                        bar.finish_with_message(format!("✅ {}", summary));
                    }
                }
            }
        }
    }
}
