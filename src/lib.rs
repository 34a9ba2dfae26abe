//! SearXNG MCP 服务核心库
//! 日志生命周期（路径解析、按时间截断、多路输出）与工具注册分模块实现。

pub mod config;
pub mod error;
pub mod format;
pub mod log_format;
pub mod log_path;
pub mod log_sink;
pub mod logger;
pub mod mcp;
pub mod model;
pub mod retention;
pub mod searxng;
pub mod tools;
