use std::sync::Arc;

use crate::interfaces::Scenario;

pub mod contract;
pub mod e2e;
pub mod formats;
pub mod negative;
pub mod smoke;
pub mod workflow;

// ============================================================================
// 场景注册表
// ============================================================================

/// 场景筛选条件，空条件匹配全部
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    /// 场景标识包含该子串
    pub only: Option<String>,
    /// 场景带有该标签
    pub tag: Option<String>,
}

impl ScenarioFilter {
    pub fn matches(&self, scenario: &dyn Scenario) -> bool {
        let id_ok = self.only.as_deref().is_none_or(|s| scenario.id().contains(s));
        let tag_ok = self
            .tag
            .as_deref()
            .is_none_or(|t| scenario.tags().iter().any(|tag| tag.eq_ignore_ascii_case(t)));
        id_ok && tag_ok
    }
}

/// 按注册顺序保存的场景集合
pub struct ScenarioRegistry {
    scenarios: Vec<Arc<dyn Scenario>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self { scenarios: Vec::new() }
    }

    /// 完整套件：冒烟 → 契约 → 负向 → 端到端 → 上传格式
    pub fn standard() -> Self {
        let mut registry = Self::new();

        registry.register(smoke::Health);
        registry.register(smoke::Ready);
        registry.register(smoke::Docs);
        registry.register(smoke::OpenApi);

        registry.register(contract::PresignedShape);
        registry.register(contract::PresignedMissingContentType);

        registry.register(negative::RejectionProbe::missing_filename());
        registry.register(negative::RejectionProbe::bad_content_type());
        registry.register(negative::PresignedEmptyFilename);
        registry.register(negative::PresignedPathTraversal);
        registry.register(negative::RejectionProbe::jobs_missing_gcs_url());
        registry.register(negative::RejectionProbe::jobs_gcs_url_wrong_type());
        registry.register(negative::JobsEmptyGcsUrl);
        registry.register(negative::RejectionProbe::unknown_job_status());

        registry.register(e2e::UploadAndPoll);
        for sample in formats::samples() {
            registry.register(sample);
        }

        registry
    }

    pub fn register<S>(&mut self, scenario: S)
    where
        S: Scenario + 'static,
    {
        self.scenarios.push(Arc::new(scenario));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Scenario>> {
        self.scenarios.iter().find(|s| s.id() == id).cloned()
    }

    pub fn select(&self, filter: &ScenarioFilter) -> Vec<Arc<dyn Scenario>> {
        self.scenarios
            .iter()
            .filter(|s| filter.matches(s.as_ref()))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> &[Arc<dyn Scenario>] {
        &self.scenarios
    }

    pub fn list(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::new()
    }
}
