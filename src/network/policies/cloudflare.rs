use tracing::info;

use crate::core::error::SkipReason;
use crate::interfaces::policy::{PolicyVerdict, ResponsePolicy};
use crate::network::envelope::ResponseEnvelope;

/// 只检查 body 的前若干字符
const BODY_SCAN_CHARS: usize = 500;

/// Cloudflare 挑战检测策略
///
/// 判定条件 (需同时满足)：状态码 403，且存在 `cf-mitigated` 头，
/// 或内容类型为 `text/html` 且 body 含挑战特征。
#[derive(Debug, Default)]
pub struct CloudflarePolicy;

impl CloudflarePolicy {
    pub fn new() -> Self {
        Self
    }

    fn contains_cf_fingerprint(&self, html: &str) -> bool {
        html.contains("Just a moment") || html.to_lowercase().contains("cloudflare")
    }

    pub fn is_challenge(&self, envelope: &ResponseEnvelope) -> bool {
        if envelope.status() != 403 {
            return false;
        }

        if envelope.has_header("cf-mitigated") {
            return true;
        }

        if envelope.content_type().to_ascii_lowercase().contains("text/html") {
            let head = envelope.text_preview(BODY_SCAN_CHARS);
            return self.contains_cf_fingerprint(&head);
        }

        false
    }
}

impl ResponsePolicy for CloudflarePolicy {
    fn name(&self) -> &str {
        "cloudflare"
    }

    fn inspect(&self, envelope: &ResponseEnvelope) -> PolicyVerdict {
        if self.is_challenge(envelope) {
            info!("检测到 Cloudflare 挑战: {} {}", envelope.method(), envelope.url());
            return PolicyVerdict::Inconclusive(SkipReason::Cloudflare);
        }
        PolicyVerdict::Pass
    }
}

/// 便捷函数
pub fn is_cloudflare_challenge(envelope: &ResponseEnvelope) -> bool {
    CloudflarePolicy.is_challenge(envelope)
}
