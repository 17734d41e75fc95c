use std::time::Instant;

use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::{debug, warn};

/// 请求追踪中间件
/// 负责记录每次调用的方法、URL、状态码与耗时
pub struct TraceMiddleware;

#[async_trait::async_trait]
impl Middleware for TraceMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let started = Instant::now();

        debug!("--> {} {}", method, url);
        let result = next.run(req, extensions).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(resp) => debug!("<-- {} {} {} ({:?})", resp.status().as_u16(), method, url, elapsed),
            Err(e) => warn!("<-- {} {} 传输失败 ({:?}): {}", method, url, elapsed, e),
        }

        result
    }
}
