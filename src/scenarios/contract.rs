//! 预签名接口的响应契约

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::contract::assertions::{assert_status, is_auth_rejection, validate_body};
use crate::contract::schemas::PresignedUpload;
use crate::core::error::Result;
use crate::core::model::endpoints;
use crate::engine::context::ScenarioContext;
use crate::interfaces::scenario::{Scenario, tags};

use super::workflow;

pub struct PresignedShape;

#[async_trait]
impl Scenario for PresignedShape {
    fn id(&self) -> &str {
        "presigned_shape"
    }

    fn description(&self) -> &str {
        "成功的预签名响应包含 bucket/key/upload_url/method/expires_in"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::CONTRACT]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let presigned = workflow::presign(ctx, "test.jpg", "image/jpeg").await?;
        info!("预签名: {} (expires_in={})", presigned.gcs_url(), presigned.expires_in);
        ctx.artifacts.add_json("presigned", &presigned);
        Ok(())
    }
}

pub struct PresignedMissingContentType;

#[async_trait]
impl Scenario for PresignedMissingContentType {
    fn id(&self) -> &str {
        "presigned_missing_content_type"
    }

    fn description(&self) -> &str {
        "content_type 可省略，响应仍符合预签名契约"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::CONTRACT]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = workflow::request_presigned(ctx, &json!({ "filename": "x.jpg" })).await?;
        if is_auth_rejection(&resp) {
            return Ok(());
        }

        assert_status(&resp, endpoints::PRESIGNED.expected, "presigned", &mut ctx.artifacts)?;
        validate_body::<PresignedUpload>(&resp, "presigned", &mut ctx.artifacts)?;
        Ok(())
    }
}
