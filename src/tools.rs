use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::Result;
use crate::format::{format_config_response, format_search_response};
use crate::mcp::{ToolRegistry, ToolSpec};
use crate::model::{SafeSearch, SearchParams};
use crate::searxng::SearxngClient;

/// Defaults applied to every `search` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchDefaults {
    pub safesearch: Option<SafeSearch>,
    pub max_results: Option<usize>,
}

impl From<&AppConfig> for SearchDefaults {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            safesearch: cfg.default_safesearch,
            max_results: cfg.max_results,
        }
    }
}

pub fn search_spec() -> ToolSpec {
    ToolSpec {
        name: "search",
        description: "Search the web through a SearXNG instance and return formatted results.",
        input_schema: json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": { "type": "string" },
                "categories": { "type": "string" },
                "engines": { "type": "string" },
                "language": { "type": "string" },
                "time_range": { "type": "string", "enum": ["day", "month", "year"] },
                "pageno": { "type": "integer", "minimum": 1, "default": 1 },
                "safesearch": { "type": "string", "enum": ["0", "1", "2"] }
            }
        }),
    }
}

pub fn config_spec() -> ToolSpec {
    ToolSpec {
        name: "config",
        description: "Show the SearXNG instance configuration: categories, enabled engines and locales.",
        input_schema: json!({ "type": "object", "properties": {} }),
    }
}

pub async fn run_search(client: &SearxngClient, defaults: SearchDefaults, args: Value) -> Result<String> {
    let mut params = SearchParams::from_value(args)?;
    if params.safesearch.is_none() {
        params.safesearch = defaults.safesearch;
    }
    let response = client.search(&params).await?;
    Ok(format_search_response(&response, defaults.max_results))
}

pub async fn run_config(client: &SearxngClient) -> Result<String> {
    let response = client.config().await?;
    Ok(format_config_response(&response))
}

pub fn register_search_tool(registry: &mut ToolRegistry, client: SearxngClient, defaults: SearchDefaults) {
    registry.register(
        search_spec(),
        Arc::new(move |args: Value| {
            let client = client.clone();
            async move { run_search(&client, defaults, args).await }.boxed()
        }),
    );
}

pub fn register_config_tool(registry: &mut ToolRegistry, client: SearxngClient) {
    registry.register(
        config_spec(),
        Arc::new(move |_args: Value| {
            let client = client.clone();
            async move { run_config(&client).await }.boxed()
        }),
    );
}

/// Registry with both SearXNG tools sharing one HTTP client.
pub fn searxng_registry(config: &AppConfig) -> Result<ToolRegistry> {
    let client = SearxngClient::new(config.base_url.clone(), config.timeout)?;
    let mut registry = ToolRegistry::new();
    register_search_tool(&mut registry, client.clone(), SearchDefaults::from(config));
    register_config_tool(&mut registry, client);
    Ok(registry)
}
