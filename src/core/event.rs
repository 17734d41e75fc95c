//! 事件系统定义
//!
//! 用于 Runner 与 UI 之间的完全解耦通信

use std::time::Duration;

use flume::{Receiver, Sender};

use crate::report::sink::Outcome;

/// 套件运行事件类型
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    /// 套件开始
    SuiteStarted { base_url: String, total: usize },

    /// 场景开始
    ScenarioStarted { index: usize, id: String },

    /// 场景结束
    ScenarioFinished {
        index: usize,
        id: String,
        outcome: Outcome,
        elapsed: Duration,
    },

    /// 任务轮询进度
    PollProgress {
        job_id: String,
        attempt: usize,
        status: Option<String>,
    },

    /// 套件结束
    SuiteFinished {
        passed: usize,
        failed: usize,
        skipped: usize,
    },
}

/// 事件发送器
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<HarnessEvent>,
}

impl EventSender {
    pub fn new(tx: Sender<HarnessEvent>) -> Self {
        Self { tx }
    }

    /// 发送事件
    pub fn emit(&self, event: HarnessEvent) {
        let _ = self.tx.send(event);
    }

    pub fn poll_progress(&self, job_id: &str, attempt: usize, status: Option<&str>) {
        self.emit(HarnessEvent::PollProgress {
            job_id: job_id.to_string(),
            attempt,
            status: status.map(str::to_string),
        });
    }
}

/// 事件接收器
pub struct EventReceiver {
    rx: Receiver<HarnessEvent>,
}

impl EventReceiver {
    pub fn new(rx: Receiver<HarnessEvent>) -> Self {
        Self { rx }
    }

    /// 非阻塞接收事件
    pub fn try_recv(&self) -> Option<HarnessEvent> {
        self.rx.try_recv().ok()
    }

    /// 异步接收事件
    pub async fn recv_async(&self) -> Option<HarnessEvent> {
        self.rx.recv_async().await.ok()
    }
}

/// 创建事件通道
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = flume::unbounded();
    (EventSender::new(tx), EventReceiver::new(rx))
}
