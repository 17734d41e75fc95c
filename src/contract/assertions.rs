//! 状态断言与异常检测 (Status Assertion & Anomaly Detection)

use serde_json::json;
use tracing::{info, warn};

use crate::contract::schemas::Contract;
use crate::core::error::{ContractViolation, HarnessError, Result};
use crate::interfaces::policy::{PolicyVerdict, ResponsePolicy};
use crate::network::envelope::ResponseEnvelope;
use crate::network::policies::{AuthRequiredPolicy, CloudflarePolicy};
use crate::report::artifacts::ArtifactRecorder;

/// 日志中 body 预览的字符上限
const LOG_BODY_CHARS: usize = 1000;
/// WAF 制品中 body 预览的字符上限
const CHALLENGE_PREVIEW_CHARS: usize = 500;

/// 输出完整的请求/响应信息
pub fn log_response(envelope: &ResponseEnvelope, label: &str) {
    info!("[{}] HTTP {} {}", label, envelope.method(), envelope.url());
    info!("[{}] Status: {}", label, envelope.status());
    info!("[{}] Headers: {:?}", label, envelope.headers_map());
    info!("[{}] Body: {:?}", label, envelope.text_preview(LOG_BODY_CHARS));
}

/// 断言状态码属于期望集合
///
/// 不匹配时：
/// - 命中 Cloudflare 挑战 → 先记录 `{label}_cloudflare_detected` 制品，再返回 `Inconclusive`；
/// - 否则输出并记录完整响应，返回契约违规。
pub fn assert_status(
    envelope: &ResponseEnvelope,
    expected: &[u16],
    label: &str,
    artifacts: &mut ArtifactRecorder,
) -> Result<()> {
    if envelope.is_status(expected) {
        return Ok(());
    }

    let label = if label.is_empty() { "request" } else { label };

    if let PolicyVerdict::Inconclusive(reason) = CloudflarePolicy::new().inspect(envelope) {
        artifacts.add_json(
            format!("{}_cloudflare_detected", label),
            &json!({
                "reason": "Blocked by Cloudflare / WAF",
                "status_code": envelope.status(),
                "headers": envelope.headers_map(),
                "body_preview": envelope.text_preview(CHALLENGE_PREVIEW_CHARS),
            }),
        );
        warn!("[{}] 被 Cloudflare/WAF 拦截，跳过", label);
        return Err(HarnessError::Inconclusive(reason));
    }

    log_response(envelope, label);
    artifacts.add_from_response(label, envelope);

    Err(ContractViolation::UnexpectedStatus {
        label: label.to_string(),
        expected: expected.to_vec(),
        actual: envelope.status(),
    }
    .into())
}

/// 可选鉴权接口：401/403 时记录原因并返回 `Inconclusive`
pub fn skip_if_auth_required(
    envelope: &ResponseEnvelope,
    endpoint: &str,
    artifacts: &mut ArtifactRecorder,
) -> Result<()> {
    match AuthRequiredPolicy::new(endpoint).inspect(envelope) {
        PolicyVerdict::Pass => Ok(()),
        PolicyVerdict::Inconclusive(reason) => {
            artifacts.add_text("skip_reason", &reason);
            Err(HarnessError::Inconclusive(reason))
        }
    }
}

/// 401/403 视为预期拒绝 (负向用例在未鉴权环境下的通过条件)
pub fn is_auth_rejection(envelope: &ResponseEnvelope) -> bool {
    matches!(envelope.status(), 401 | 403)
}

/// 解析并校验响应 body
///
/// 失败时先记录完整响应再返回错误，校验错误绝不静默吞掉。
pub fn validate_body<T: Contract>(
    envelope: &ResponseEnvelope,
    label: &str,
    artifacts: &mut ArtifactRecorder,
) -> Result<T> {
    let parsed = envelope
        .require_json(label)
        .and_then(|body| T::parse(&body).map_err(HarnessError::from));

    if let Err(e) = &parsed {
        warn!("[{}] 响应结构不符合契约: {}", label, e);
        log_response(envelope, label);
        artifacts.add_from_response(&format!("{}_invalid", label), envelope);
        artifacts.add_text(format!("{}_validation_error", label), e);
    }
    parsed
}

/// 断言条件成立，否则记录说明并返回契约违规
pub fn ensure(condition: bool, message: impl Into<String>, artifacts: &mut ArtifactRecorder) -> Result<()> {
    if condition {
        return Ok(());
    }
    let message = message.into();
    artifacts.add_text("assertion_failed", &message);
    Err(HarnessError::invariant(message))
}
