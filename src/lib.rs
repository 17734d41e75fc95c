//! 任务处理 API 的黑盒契约与端到端测试工具
//!
//! 核心组件：带响应结构校验的 HTTP 契约客户端，以及异步资源的有界轮询器。

pub mod contract;
pub mod core;
pub mod engine;
pub mod interfaces;
pub mod network;
pub mod report;
pub mod scenarios;
pub mod ui;
pub mod utils;
