//! Plain-text rendering of SearXNG responses for tool results.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{display_value, ConfigResponse, Infobox, SearchResponse};

fn format_infobox(infobox: &Infobox) -> Vec<String> {
    let mut lines = vec![format!("- {}: {}", infobox.infobox, infobox.content)];
    if !infobox.urls.is_empty() {
        let urls: Vec<String> = infobox.urls.iter().map(display_url).collect();
        lines.push(format!("  URLs: {}", urls.join(", ")));
    }
    lines
}

/// Infobox URLs arrive either as plain strings or as `{title, url}` objects.
fn display_url(value: &serde_json::Value) -> String {
    match value.get("url").and_then(|u| u.as_str()) {
        Some(url) => url.to_string(),
        None => display_value(value),
    }
}

pub fn format_search_response(response: &SearchResponse, max_results: Option<usize>) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("Query: {}", response.query));
    lines.push(format!("Total results: {}", response.number_of_results));
    lines.push(String::new());

    if !response.answers.is_empty() {
        lines.push("Answers:".to_string());
        for answer in &response.answers {
            lines.push(format!("- {}", display_answer(answer)));
        }
        lines.push(String::new());
    }

    if !response.infoboxes.is_empty() {
        lines.push("Infoboxes:".to_string());
        for infobox in &response.infoboxes {
            lines.extend(format_infobox(infobox));
        }
        lines.push(String::new());
    }

    if !response.corrections.is_empty() {
        lines.push(format!("Corrections: {}", response.corrections.join(", ")));
        lines.push(String::new());
    }

    if !response.suggestions.is_empty() {
        lines.push(format!("Suggestions: {}", response.suggestions.join(", ")));
        lines.push(String::new());
    }

    if response.results.is_empty() {
        lines.push("No results.".to_string());
    } else {
        lines.push("Results:".to_string());
        let limit = max_results.unwrap_or(usize::MAX);
        for (index, result) in response.results.iter().take(limit).enumerate() {
            lines.push(format!("{}. {}", index + 1, result.title));
            lines.push(format!("   URL: {}", result.url));
            if !result.content.is_empty() {
                lines.push(format!("   Snippet: {}", result.content));
            }
            if let Some(published) = result.published_date.as_deref().filter(|p| !p.is_empty()) {
                lines.push(format!("   Published: {published}"));
            }
            let engines = if result.engines.is_empty() {
                result.engine.clone()
            } else {
                result.engines.join(", ")
            };
            if !engines.is_empty() {
                lines.push(format!("   Engines: {engines}"));
            }
        }
    }

    if !response.unresponsive_engines.is_empty() {
        let engines: Vec<String> = response
            .unresponsive_engines
            .iter()
            .map(display_unresponsive)
            .collect();
        lines.push(String::new());
        lines.push(format!("Unresponsive engines: {}", engines.join(", ")));
    }

    lines.join("\n")
}

/// Newer SearXNG versions send answers as objects carrying an `answer` field.
fn display_answer(value: &serde_json::Value) -> String {
    match value.get("answer").and_then(|a| a.as_str()) {
        Some(answer) => answer.to_string(),
        None => display_value(value),
    }
}

/// Unresponsive engines come as `[name, reason]` pairs or bare names.
fn display_unresponsive(value: &serde_json::Value) -> String {
    match value.as_array() {
        Some(pair) => pair.iter().map(display_value).collect::<Vec<_>>().join(": "),
        None => display_value(value),
    }
}

pub fn format_config_response(config: &ConfigResponse) -> String {
    let mut grouped: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for engine in config.engines.iter().filter(|e| e.enabled) {
        if engine.categories.is_empty() {
            grouped.entry("uncategorized").or_default().insert(engine.name.as_str());
        } else {
            for category in &engine.categories {
                grouped.entry(category.as_str()).or_default().insert(engine.name.as_str());
            }
        }
    }

    let mut lines: Vec<String> = vec![
        format!("Instance: {}", config.instance_name),
        format!("Version: {}", config.version),
        format!("Default locale: {}", config.default_locale),
        format!("Safe search: {}", config.safe_search),
        format!("Categories: {}", config.categories.join(", ")),
        String::new(),
        "Enabled engines by category:".to_string(),
    ];

    for (category, engines) in &grouped {
        let names: Vec<&str> = engines.iter().copied().collect();
        lines.push(format!("- {}: {}", category, names.join(", ")));
    }

    lines.push(String::new());
    lines.push(format!("Locales: {}", config.locales.codes().join(", ")));

    lines.join("\n")
}
