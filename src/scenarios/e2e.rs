//! 端到端流程：预签名 → 直传 → 创建任务 → 轮询状态

use async_trait::async_trait;
use tracing::{info, warn};

use crate::contract::assertions::ensure;
use crate::core::error::Result;
use crate::engine::context::ScenarioContext;
use crate::engine::poller::PollOutcome;
use crate::interfaces::scenario::{Scenario, tags};

use super::workflow;

pub struct UploadAndPoll;

#[async_trait]
impl Scenario for UploadAndPoll {
    fn id(&self) -> &str {
        "e2e_upload_and_poll"
    }

    fn description(&self) -> &str {
        "上传测试文件，创建任务并轮询直到终态或超时"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::E2E]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let presigned = workflow::presign(ctx, "test.jpg", "image/jpeg").await?;
        workflow::upload(ctx, &presigned, workflow::dummy_jpeg(), "image/jpeg").await?;

        let gcs_url = presigned.gcs_url();
        ctx.artifacts.add_text("gcs_url", &gcs_url);
        let job_id = workflow::create_job(ctx, &gcs_url).await?;

        let outcome = workflow::wait_for_job(ctx, &job_id).await?;
        match &outcome {
            PollOutcome::Terminal(s) => info!("任务 {} 结束: {}", job_id, s.normalized_status()),
            PollOutcome::Pending(s) => warn!(
                "任务 {} 在轮询期限内未结束，最后状态: {}",
                job_id,
                s.normalized_status()
            ),
            PollOutcome::NoObservation => {}
        }

        ensure(
            outcome.last().is_some(),
            format!("no status observed for job {}", job_id),
            &mut ctx.artifacts,
        )
    }
}
