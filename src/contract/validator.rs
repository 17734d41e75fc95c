//! 响应结构校验器 (Response Shape Validator)
//!
//! Schema 由若干字段组构成，每组是一组按优先级排列的可接受键名 (alias)。
//! - 首个非空且类型正确的 alias 胜出；类型不符的 alias 被跳过。
//! - 必填组无胜出者时失败：曾出现类型不符的值报类型错误，否则报缺失。
//! - `null` 与空白字符串视为缺失。
//! - 未声明的字段一律忽略 (向前兼容)。
//! - 可选字段类型不符时按缺失处理，不导致失败。

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::core::error::SchemaValidationError;

/// 字段类型约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    /// 整数，可带下限
    Integer { min: Option<i64> },
    Object,
    /// 合法的 http(s) 绝对 URL
    AbsoluteUrl,
    Any,
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "boolean",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Object => "object",
            FieldKind::AbsoluteUrl => "absolute URL string",
            FieldKind::Any => "any",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String | FieldKind::AbsoluteUrl => value.is_string(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Integer { .. } => as_integer(value).is_some(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }

    /// 类型匹配之后的取值约束
    fn check_value(&self, field: &str, value: &Value) -> Result<(), SchemaValidationError> {
        match self {
            FieldKind::Integer { min: Some(min) } => {
                let n = as_integer(value).unwrap_or_default();
                if n < *min {
                    return Err(SchemaValidationError::InvalidValue {
                        field: field.to_string(),
                        reason: format!("must be >= {} (got {})", min, n),
                    });
                }
            }
            FieldKind::AbsoluteUrl => {
                let raw = value.as_str().unwrap_or_default();
                let parsed = url::Url::parse(raw).map_err(|e| SchemaValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("not a valid URL: {}", e),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                    return Err(SchemaValidationError::InvalidValue {
                        field: field.to_string(),
                        reason: format!("expected an absolute http(s) URL, got {:?}", raw),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// 字段组：规范名 + 可接受的 alias 列表
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub kind: FieldKind,
    pub required: bool,
}

/// 声明式响应结构
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn required(self, name: &'static str, kind: FieldKind) -> Self {
        self.group(name, &[name], kind, true)
    }

    pub fn optional(self, name: &'static str, kind: FieldKind) -> Self {
        self.group(name, &[name], kind, false)
    }

    /// 多 alias 字段组，`aliases` 按优先级排列
    pub fn group(mut self, name: &'static str, aliases: &[&'static str], kind: FieldKind, required: bool) -> Self {
        self.fields.push(FieldRule {
            name,
            aliases: aliases.to_vec(),
            kind,
            required,
        });
        self
    }

    pub fn validate(&self, body: &Value) -> Result<ValidatedInstance, SchemaValidationError> {
        validate(self, body)
    }
}

/// 解析出的单个字段
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// 实际命中的键名
    pub source: &'static str,
    pub value: Value,
}

/// 通过校验的实例，按 schema 声明顺序保存命中的字段
#[derive(Debug, Clone, Default)]
pub struct ValidatedInstance {
    fields: IndexMap<&'static str, ResolvedField>,
}

impl ValidatedInstance {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn source(&self, name: &str) -> Option<&'static str> {
        self.fields.get(name).map(|f| f.source)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.str(name).map(str::to_string)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(as_integer)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 按 schema 校验已解析的 body
pub fn validate(schema: &Schema, body: &Value) -> Result<ValidatedInstance, SchemaValidationError> {
    let object = body.as_object().ok_or(SchemaValidationError::NotAnObject {
        found: type_name(body),
    })?;

    let mut instance = ValidatedInstance::default();

    for rule in &schema.fields {
        let mut winner: Option<ResolvedField> = None;
        let mut mismatch: Option<(&str, &'static str)> = None;

        for alias in &rule.aliases {
            let Some(value) = object.get(*alias).filter(|v| !is_empty(v)) else {
                continue;
            };

            if !rule.kind.matches(value) {
                debug!("[{}] 跳过类型不符的字段 `{}`", schema.name, alias);
                mismatch.get_or_insert((*alias, type_name(value)));
                continue;
            }

            winner = Some(ResolvedField {
                source: *alias,
                value: value.clone(),
            });
            break;
        }

        match (winner, mismatch) {
            (Some(field), _) => {
                rule.kind.check_value(field.source, &field.value)?;
                instance.fields.insert(rule.name, field);
            }
            (None, Some((alias, found))) if rule.required => {
                return Err(SchemaValidationError::TypeMismatch {
                    field: alias.to_string(),
                    expected: rule.kind.expected(),
                    found,
                });
            }
            (None, None) if rule.required => {
                return Err(SchemaValidationError::MissingField {
                    aliases: rule.aliases.iter().map(|a| a.to_string()).collect(),
                });
            }
            (None, _) => {}
        }
    }

    Ok(instance)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    // 3600.0 这类无小数部分的浮点数按整数接受
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i64)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job_schema() -> Schema {
        Schema::new("CreateJob")
            .group("job_id", &["job_id", "id"], FieldKind::String, true)
            .optional("note", FieldKind::String)
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let v = job_schema().validate(&json!({"job_id": "", "id": "abc"})).unwrap();
        assert_eq!(v.str("job_id"), Some("abc"));
        assert_eq!(v.source("job_id"), Some("id"));

        let v = job_schema().validate(&json!({"job_id": "j1", "id": "i1"})).unwrap();
        assert_eq!(v.str("job_id"), Some("j1"));
    }

    #[test]
    fn all_aliases_absent_fails() {
        for body in [json!({}), json!({"job_id": null, "id": ""}), json!({"id": "   "})] {
            let err = job_schema().validate(&body).unwrap_err();
            assert_eq!(
                err,
                SchemaValidationError::MissingField {
                    aliases: vec!["job_id".into(), "id".into()]
                }
            );
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let v = job_schema()
            .validate(&json!({"id": "x", "extra": [1, 2], "nested": {"a": 1}}))
            .unwrap();
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn required_type_mismatch_fails() {
        let err = job_schema().validate(&json!({"job_id": 42})).unwrap_err();
        assert!(matches!(err, SchemaValidationError::TypeMismatch { ref field, .. } if field == "job_id"));
    }

    #[test]
    fn mistyped_alias_does_not_shadow_a_valid_one() {
        let v = job_schema().validate(&json!({"job_id": "abc", "id": 42})).unwrap();
        assert_eq!(v.str("job_id"), Some("abc"));
        assert_eq!(v.source("job_id"), Some("job_id"));

        let v = job_schema().validate(&json!({"job_id": 42, "id": "abc"})).unwrap();
        assert_eq!(v.str("job_id"), Some("abc"));
        assert_eq!(v.source("job_id"), Some("id"));
    }

    #[test]
    fn all_aliases_mistyped_reports_the_first() {
        let err = job_schema().validate(&json!({"job_id": 42, "id": true})).unwrap_err();
        assert!(matches!(err, SchemaValidationError::TypeMismatch { ref field, found: "number", .. } if field == "job_id"));
    }

    #[test]
    fn optional_type_mismatch_is_dropped() {
        let v = job_schema().validate(&json!({"id": "x", "note": 5})).unwrap();
        assert!(!v.contains("note"));
    }

    #[test]
    fn integer_lower_bound_is_enforced() {
        let schema = Schema::new("T").required("expires_in", FieldKind::Integer { min: Some(1) });
        assert!(schema.validate(&json!({"expires_in": 900})).is_ok());
        assert!(schema.validate(&json!({"expires_in": 60.0})).is_ok());
        assert!(matches!(
            schema.validate(&json!({"expires_in": 0})).unwrap_err(),
            SchemaValidationError::InvalidValue { .. }
        ));
        assert!(matches!(
            schema.validate(&json!({"expires_in": 1.5})).unwrap_err(),
            SchemaValidationError::TypeMismatch { .. }
        ));
        assert!(matches!(
            schema.validate(&json!({"expires_in": "900"})).unwrap_err(),
            SchemaValidationError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn absolute_url_is_checked() {
        let schema = Schema::new("T").required("upload_url", FieldKind::AbsoluteUrl);
        assert!(schema.validate(&json!({"upload_url": "https://storage.googleapis.com/b/k?X-Goog-Signature=1"})).is_ok());
        for bad in ["/relative/path", "not a url", "ftp://host/file", "mailto:a@b.c"] {
            assert!(schema.validate(&json!({"upload_url": bad})).is_err(), "{bad}");
        }
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = job_schema().validate(&json!(["job_id"])).unwrap_err();
        assert_eq!(err, SchemaValidationError::NotAnObject { found: "array" });
    }
}
