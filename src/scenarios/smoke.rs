//! 冒烟检查：服务存活、就绪与文档可达

use async_trait::async_trait;
use tracing::info;

use crate::contract::assertions::{assert_status, validate_body};
use crate::contract::schemas::{HealthResponse, OpenApiDocument};
use crate::core::error::Result;
use crate::core::model::endpoints;
use crate::engine::context::ScenarioContext;
use crate::interfaces::scenario::{Scenario, tags};

pub struct Health;

#[async_trait]
impl Scenario for Health {
    fn id(&self) -> &str {
        "health"
    }

    fn description(&self) -> &str {
        "GET /health 返回 200，JSON body 可解析"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::SMOKE]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = ctx.api.call(&endpoints::HEALTH, &[], None).await?;
        assert_status(&resp, endpoints::HEALTH.expected, "health", &mut ctx.artifacts)?;

        // 非 JSON 的存活探针同样合法
        if resp.is_json_content() {
            let health = validate_body::<HealthResponse>(&resp, "health", &mut ctx.artifacts)?;
            ctx.artifacts.add_json("health", &health);
        }
        Ok(())
    }
}

pub struct Ready;

#[async_trait]
impl Scenario for Ready {
    fn id(&self) -> &str {
        "ready"
    }

    fn description(&self) -> &str {
        "GET /ready 反映依赖可用性 (200 就绪 / 503 未就绪)"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::SMOKE]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = ctx.api.call(&endpoints::READY, &[], None).await?;
        assert_status(&resp, endpoints::READY.expected, "ready", &mut ctx.artifacts)?;
        if resp.status() == 503 {
            info!("服务未就绪 (503)");
        }
        Ok(())
    }
}

pub struct Docs;

#[async_trait]
impl Scenario for Docs {
    fn id(&self) -> &str {
        "docs"
    }

    fn description(&self) -> &str {
        "GET /docs 可访问"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::SMOKE]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = ctx.api.call(&endpoints::DOCS, &[], None).await?;
        assert_status(&resp, endpoints::DOCS.expected, "docs", &mut ctx.artifacts)
    }
}

pub struct OpenApi;

#[async_trait]
impl Scenario for OpenApi {
    fn id(&self) -> &str {
        "openapi"
    }

    fn description(&self) -> &str {
        "GET /openapi.json 返回包含 paths 的文档"
    }

    fn tags(&self) -> &[&'static str] {
        &[tags::SMOKE]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = ctx.api.call(&endpoints::OPENAPI, &[], None).await?;
        assert_status(&resp, endpoints::OPENAPI.expected, "openapi", &mut ctx.artifacts)?;

        let doc = validate_body::<OpenApiDocument>(&resp, "openapi", &mut ctx.artifacts)?;
        info!(
            "OpenAPI 文档: {} ({} 个路径)",
            doc.title.as_deref().unwrap_or("untitled"),
            doc.paths.len()
        );
        Ok(())
    }
}
