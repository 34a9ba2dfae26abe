use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use searxng_mcp::config::LoggerConfig;
use searxng_mcp::log_path::FixedLogDir;
use searxng_mcp::logger::Logger;
use searxng_mcp::mcp::{McpServer, ToolRegistry};
use searxng_mcp::model::SafeSearch;
use searxng_mcp::searxng::SearxngClient;
use searxng_mcp::tools::{register_config_tool, register_search_tool, SearchDefaults};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_logger(dir: &TempDir) -> Logger {
    let cfg = LoggerConfig {
        log_file: PathBuf::from("mcp.log"),
        log_to_stderr: false,
        ..LoggerConfig::default()
    };
    Logger::init_with(&cfg, &FixedLogDir(dir.path().to_path_buf())).await.unwrap()
}

async fn server_for(base: &str, defaults: SearchDefaults, dir: &TempDir) -> McpServer {
    let client = SearxngClient::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap();
    let mut registry = ToolRegistry::new();
    register_search_tool(&mut registry, client.clone(), defaults);
    register_config_tool(&mut registry, client);
    McpServer::new(registry, test_logger(dir).await)
}

async fn exchange(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
    let mut out: Vec<u8> = Vec::new();
    server.serve(input.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": "tools/call", "params": { "name": name, "arguments": arguments } })
}

fn text_of(resp: &Value) -> &str {
    resp["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn test_handshake_and_tool_listing() {
    let dir = tempdir().unwrap();
    let server = server_for("http://127.0.0.1:9", SearchDefaults::default(), &dir).await;

    let responses = exchange(
        &server,
        &[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" }),
        ],
    )
    .await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "searxng");
    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["search", "config"]);
    assert_eq!(responses[1]["result"]["tools"][0]["inputSchema"]["required"], json!(["query"]));
    assert_eq!(responses[2]["result"], json!({}));
}

#[tokio::test]
async fn test_protocol_errors() {
    let dir = tempdir().unwrap();
    let server = server_for("http://127.0.0.1:9", SearchDefaults::default(), &dir).await;

    let garbage = server.handle_line("{not json").await.unwrap();
    let garbage = serde_json::to_value(&garbage).unwrap();
    assert_eq!(garbage["error"]["code"], -32700);
    assert_eq!(garbage["id"], Value::Null);

    let responses = exchange(
        &server,
        &[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "resources/list" }),
            call(2, "nope", json!({})),
            call(3, "search", json!({ "pageno": 2 })),
            call(4, "search", json!({ "query": "x", "pageno": 0 })),
        ],
    )
    .await;

    assert_eq!(responses[0]["error"]["code"], -32601);
    assert_eq!(responses[1]["error"]["code"], -32602);
    assert_eq!(responses[2]["error"]["code"], -32602);
    assert_eq!(responses[3]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_null_id_is_answered() {
    let dir = tempdir().unwrap();
    let server = server_for("http://127.0.0.1:9", SearchDefaults::default(), &dir).await;

    let responses = exchange(
        &server,
        &[
            json!({ "jsonrpc": "2.0", "id": null, "method": "ping" }),
            json!({ "jsonrpc": "2.0", "method": "ping" }),
        ],
    )
    .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["result"], json!({}));
}

#[tokio::test]
async fn test_search_tool_renders_results() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(query_param("format", "json"))
        .and(query_param("pageno", "2"))
        .and(query_param("time_range", "year"))
        .and(query_param("safesearch", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "rust lang",
            "number_of_results": 2,
            "results": [
                { "title": "Rust", "url": "https://rust-lang.org", "content": "A language", "engine": "ddg", "engines": ["ddg"] },
                { "title": "Book", "url": "https://doc.rust-lang.org/book", "engine": "brave" }
            ]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let dir = tempdir().unwrap();
    let defaults = SearchDefaults {
        safesearch: Some(SafeSearch::Strict),
        max_results: Some(1),
    };
    // 路径部分会被 /search 替换
    let server = server_for(&format!("{}/ignored", mock.uri()), defaults, &dir).await;

    let responses = exchange(
        &server,
        &[call(7, "search", json!({ "query": "rust lang", "pageno": 2, "time_range": "year" }))],
    )
    .await;

    let resp = &responses[0];
    assert_eq!(resp["id"], 7);
    assert!(resp["result"].get("isError").is_none());
    let text = text_of(resp);
    assert!(text.starts_with("Query: rust lang\nTotal results: 2\n"));
    assert!(text.contains("1. Rust\n   URL: https://rust-lang.org\n   Snippet: A language\n   Engines: ddg"));
    assert!(!text.contains("2. Book"));
}

#[tokio::test]
async fn test_remote_failure_becomes_error_result() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;

    let dir = tempdir().unwrap();
    let server = server_for(&mock.uri(), SearchDefaults::default(), &dir).await;
    let responses = exchange(
        &server,
        &[call(1, "search", json!({ "query": "boom" })), call(2, "config", json!({}))],
    )
    .await;

    assert_eq!(responses[0]["result"]["isError"], true);
    assert_eq!(text_of(&responses[0]), "SearXNG search failed with status 500");
    assert_eq!(responses[1]["result"]["isError"], true);
    assert_eq!(text_of(&responses[1]), "SearXNG config failed with status 503");
}

#[tokio::test]
async fn test_unreachable_instance_reports_transport_error() {
    let dir = tempdir().unwrap();
    let server = server_for("http://127.0.0.1:9", SearchDefaults::default(), &dir).await;
    let responses = exchange(&server, &[call(1, "search", json!({ "query": "x" }))]).await;

    assert_eq!(responses[0]["result"]["isError"], true);
    assert!(text_of(&responses[0]).starts_with("SearXNG request failed: "));
}

#[tokio::test]
async fn test_config_tool_and_call_logging() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instance_name": "searx",
            "version": "2024.6.1",
            "default_locale": "",
            "safe_search": 0,
            "categories": ["general"],
            "engines": [{ "name": "ddg", "categories": ["general"], "enabled": true }],
            "locales": { "en": "English" }
        })))
        .mount(&mock)
        .await;

    let dir = tempdir().unwrap();
    let server = server_for(&mock.uri(), SearchDefaults::default(), &dir).await;
    let responses = exchange(&server, &[call(1, "config", Value::Null)]).await;

    let text = text_of(&responses[0]);
    assert!(text.starts_with("Instance: searx\nVersion: 2024.6.1"));
    assert!(text.contains("- general: ddg"));
    assert!(text.ends_with("Locales: en"));
    drop(server);

    let log = std::fs::read_to_string(dir.path().join("mcp.log")).unwrap();
    let records: Vec<Value> = log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    let call_record = records
        .iter()
        .find(|r| r["msg"] == "tool call succeeded")
        .expect("tool call was logged");
    assert_eq!(call_record["tool"], "config");
    assert!(call_record["elapsed_ms"].is_u64());
}
