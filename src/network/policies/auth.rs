use tracing::info;

use crate::core::error::SkipReason;
use crate::interfaces::policy::{PolicyVerdict, ResponsePolicy};
use crate::network::envelope::ResponseEnvelope;

/// 鉴权缺失检测策略
///
/// 用于可选鉴权的接口：401/403 说明当前环境缺少有效令牌。
#[derive(Debug)]
pub struct AuthRequiredPolicy {
    endpoint: String,
}

impl AuthRequiredPolicy {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl ResponsePolicy for AuthRequiredPolicy {
    fn name(&self) -> &str {
        "auth_required"
    }

    fn inspect(&self, envelope: &ResponseEnvelope) -> PolicyVerdict {
        if matches!(envelope.status(), 401 | 403) {
            info!("{} 返回 {}，需要鉴权", self.endpoint, envelope.status());
            return PolicyVerdict::Inconclusive(SkipReason::AuthRequired {
                endpoint: self.endpoint.clone(),
            });
        }
        PolicyVerdict::Pass
    }
}
