//! 错误处理体系 (Error Handling System)
//!
//! 定义契约校验相关的错误类型、跳过原因以及全局 Result 别名。

use thiserror::Error;

/// 跳过原因 (Skip Reasons)
///
/// 表示测试环境而非被测契约导致的"无法判定"。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 接口需要鉴权 (401/403)，且未配置或配置了无效的 API_TOKEN
    AuthRequired { endpoint: String },
    /// 触发 Cloudflare / WAF 挑战
    Cloudflare,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AuthRequired { endpoint } => {
                write!(f, "{} requires auth; set API_TOKEN", endpoint)
            }
            SkipReason::Cloudflare => write!(f, "Blocked by Cloudflare/WAF (cf-mitigated challenge)"),
        }
    }
}

/// 响应结构校验失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("body is not a JSON object (got {found})")]
    NotAnObject { found: &'static str },

    #[error("missing required field: one of [{}]", aliases.join(", "))]
    MissingField { aliases: Vec<String> },

    #[error("field `{field}` has wrong type: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{field}` is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 契约违规 (Contract Violations)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("[{label}] expected status in {expected:?}, got {actual}")]
    UnexpectedStatus {
        label: String,
        expected: Vec<u16>,
        actual: u16,
    },

    #[error("[{label}] response body is not valid JSON")]
    MalformedBody { label: String },

    #[error("unsupported upload method: {0}")]
    UnsupportedMethod(String),

    #[error("{0}")]
    Invariant(String),
}

/// 全局错误定义 (Harness Domain Errors)
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Middleware error: {0}")]
    Middleware(reqwest_middleware::Error),

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Schema validation failed: {0}")]
    Schema(#[from] SchemaValidationError),

    /// 环境因素导致无法判定，映射为 Skipped
    #[error("Inconclusive: {0}")]
    Inconclusive(SkipReason),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, HarnessError>;

impl From<reqwest_middleware::Error> for HarnessError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => HarnessError::Transport(e),
            other => HarnessError::Middleware(other),
        }
    }
}

impl HarnessError {
    /// 提取跳过原因 (若为 Inconclusive)
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            HarnessError::Inconclusive(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_inconclusive(&self) -> bool {
        self.skip_reason().is_some()
    }

    /// 传输层错误 (DNS / 连接 / 超时)
    pub fn is_transport(&self) -> bool {
        matches!(self, HarnessError::Transport(_))
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        HarnessError::Contract(ContractViolation::Invariant(msg.into()))
    }

    pub fn auth_required(endpoint: impl Into<String>) -> Self {
        HarnessError::Inconclusive(SkipReason::AuthRequired {
            endpoint: endpoint.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_lists_every_alias() {
        let err = SchemaValidationError::MissingField {
            aliases: vec!["job_id".into(), "id".into()],
        };
        assert_eq!(err.to_string(), "missing required field: one of [job_id, id]");
    }

    #[test]
    fn only_inconclusive_carries_skip_reason() {
        assert!(HarnessError::auth_required("POST /jobs").is_inconclusive());
        assert!(!HarnessError::invariant("boom").is_inconclusive());
        assert_eq!(
            HarnessError::Inconclusive(SkipReason::Cloudflare).skip_reason(),
            Some(&SkipReason::Cloudflare)
        );
    }
}
