//! 场景定义
//!
//! 每个场景是一条独立的契约检查或端到端流程。

use async_trait::async_trait;

use crate::core::error::Result;
use crate::engine::context::ScenarioContext;

pub mod tags {
    pub const SMOKE: &str = "smoke";
    pub const CONTRACT: &str = "contract";
    pub const NEGATIVE: &str = "negative";
    pub const E2E: &str = "e2e";
    pub const UPLOAD: &str = "upload";
}

/// 场景 Trait
///
/// `run` 的返回值即场景结果：
/// - `Ok(())` 通过 (包括负向用例收到预期的拒绝)；
/// - `Err(Inconclusive)` 跳过；
/// - 其余错误为失败。
#[async_trait]
pub trait Scenario: Send + Sync {
    /// 场景唯一标识
    fn id(&self) -> &str;

    /// 一句话说明
    fn description(&self) -> &str;

    fn tags(&self) -> &[&'static str];

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()>;
}
