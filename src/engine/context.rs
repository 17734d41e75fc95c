//! 场景执行上下文 (Scenario Context)
//!
//! 每个场景独占一份：独立的 API 客户端、上传客户端与制品记录器，没有跨场景共享的可变状态。

use std::sync::Arc;

use crate::core::config::HarnessConfig;
use crate::core::error::Result;
use crate::core::event::{EventSender, HarnessEvent};
use crate::engine::poller::PollSettings;
use crate::network::client::ApiClient;
use crate::report::artifacts::{Artifact, ArtifactRecorder};

pub struct ScenarioContext {
    /// 被测 API 客户端 (带基准 URL 与鉴权头)
    pub api: ApiClient,
    /// 预签名直传客户端 (无基准 URL，无鉴权头)
    pub uploader: ApiClient,
    /// 只读的全局配置
    pub config: Arc<HarnessConfig>,
    /// 本场景的制品记录器
    pub artifacts: ArtifactRecorder,
    /// 事件分发句柄
    pub events: Option<EventSender>,
}

impl ScenarioContext {
    pub fn new(config: Arc<HarnessConfig>) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(&config.api)?,
            uploader: ApiClient::uploader(&config.upload)?,
            config,
            artifacts: ArtifactRecorder::new(),
            events: None,
        })
    }

    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    pub fn emit(&self, event: HarnessEvent) {
        if let Some(ref sender) = self.events {
            sender.emit(event);
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::from(&self.config.poll)
    }

    /// 取走已记录的制品
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts.into_artifacts()
    }
}
