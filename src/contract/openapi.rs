//! OpenAPI 文档内省
//!
//! 列出接口清单、查看单个操作的请求体定义与组件 schema。

use serde::Serialize;
use serde_json::Value;

/// Path Item 中代表 HTTP 操作的键
const OPERATION_KEYS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// `(METHOD, path)`，按 path 再按 method 排序
pub fn list_endpoints(doc: &Value) -> Vec<(String, String)> {
    let mut items: Vec<(String, String)> = doc
        .get("paths")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .flat_map(|(path, item)| {
            item.as_object()
                .into_iter()
                .flatten()
                .filter(|(method, _)| OPERATION_KEYS.contains(&method.to_ascii_lowercase().as_str()))
                .map(move |(method, _)| (method.to_uppercase(), path.clone()))
        })
        .collect();

    items.sort_by(|a, b| (&a.1, &a.0).cmp(&(&b.1, &b.0)));
    items
}

/// 单个操作的摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationSummary {
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    pub security: Option<Value>,
    pub body_required: Option<bool>,
    pub content_types: Vec<String>,
    pub json_schema: Option<Value>,
    pub example: Option<Value>,
    pub examples: Option<Value>,
}

/// 查找 `paths.<path>.<method>`，不存在时返回 `None`
pub fn describe_operation(doc: &Value, path: &str, method: &str) -> Option<OperationSummary> {
    let op = doc.get("paths")?.get(path)?.get(method.to_ascii_lowercase())?;

    let body = op.get("requestBody");
    let content = body.and_then(|b| b.get("content")).and_then(Value::as_object);
    let app_json = content.and_then(|c| c.get("application/json"));

    Some(OperationSummary {
        method: method.to_uppercase(),
        path: path.to_string(),
        operation_id: op.get("operationId").and_then(Value::as_str).map(str::to_string),
        tags: op
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        security: op.get("security").cloned(),
        body_required: body.and_then(|b| b.get("required")).and_then(Value::as_bool),
        content_types: content.map(|c| c.keys().cloned().collect()).unwrap_or_default(),
        json_schema: app_json.and_then(|j| j.get("schema")).cloned(),
        example: app_json.and_then(|j| j.get("example")).cloned(),
        examples: app_json.and_then(|j| j.get("examples")).cloned(),
    })
}

/// `components.schemas.<name>`
pub fn component_schema<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    doc.get("components")?.get("schemas")?.get(name)
}
