use crate::core::error::SkipReason;
use crate::network::envelope::ResponseEnvelope;

/// 策略判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyVerdict {
    /// 未发现异常，按契约正常判定
    Pass,
    /// 响应反映的是环境状况而非被测契约，降级为跳过
    Inconclusive(SkipReason),
}

/// 响应异常检测策略接口
///
/// - 策略负责：识别与被测契约无关的环境性响应 (WAF 拦截、鉴权缺失)。
/// - 策略不负责：不决定契约本身是否通过。
pub trait ResponsePolicy: Send + Sync + std::fmt::Debug {
    /// 策略名称 (用于调试/日志)
    fn name(&self) -> &str;

    /// 每次调用重新计算，不缓存
    fn inspect(&self, envelope: &ResponseEnvelope) -> PolicyVerdict;
}
