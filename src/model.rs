use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SearxngMcpError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Month,
    Year,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafeSearch {
    #[serde(rename = "0")]
    Off,
    #[serde(rename = "1")]
    Moderate,
    #[serde(rename = "2")]
    Strict,
}

impl SafeSearch {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "0" => Some(SafeSearch::Off),
            "1" => Some(SafeSearch::Moderate),
            "2" => Some(SafeSearch::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafeSearch::Off => "0",
            SafeSearch::Moderate => "1",
            SafeSearch::Strict => "2",
        }
    }
}

/// `search` 工具的入参。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub engines: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default = "default_pageno")]
    pub pageno: u32,
    #[serde(default)]
    pub safesearch: Option<SafeSearch>,
}

fn default_pageno() -> u32 {
    1
}

impl SearchParams {
    pub fn from_value(value: Value) -> Result<Self> {
        let value = if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        };
        let params: SearchParams = serde_json::from_value(value)
            .map_err(|e| SearxngMcpError::InvalidRequest(format!("invalid params: {e}")))?;
        if params.pageno < 1 {
            return Err(SearxngMcpError::InvalidRequest(
                "invalid params: pageno must be >= 1".to_string(),
            ));
        }
        Ok(params)
    }

    /// Query pairs sent to `/search`; unset options are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.query.clone()), ("format", "json".to_string())];
        let optional = [
            ("categories", self.categories.clone()),
            ("engines", self.engines.clone()),
            ("language", self.language.clone()),
            ("time_range", self.time_range.map(|t| t.as_str().to_string())),
            ("pageno", Some(self.pageno.to_string())),
            ("safesearch", self.safesearch.map(|s| s.as_str().to_string())),
        ];
        for (key, value) in optional {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                pairs.push((key, v));
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub engine: String,
    pub engines: Vec<String>,
    pub score: f64,
    pub category: String,
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Infobox {
    pub infobox: String,
    pub id: String,
    pub content: String,
    pub urls: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub query: String,
    pub number_of_results: f64,
    pub results: Vec<SearchResult>,
    pub answers: Vec<Value>,
    pub corrections: Vec<String>,
    pub infoboxes: Vec<Infobox>,
    pub suggestions: Vec<String>,
    pub unresponsive_engines: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub name: String,
    pub categories: Vec<String>,
    pub shortcut: String,
    pub enabled: bool,
    pub paging: bool,
    pub language_support: bool,
    pub safesearch: bool,
    pub time_range_support: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locales {
    Map(serde_json::Map<String, Value>),
    List(Vec<String>),
}

impl Default for Locales {
    fn default() -> Self {
        Locales::List(Vec::new())
    }
}

impl Locales {
    pub fn codes(&self) -> Vec<String> {
        match self {
            Locales::Map(m) => m.keys().cloned().collect(),
            Locales::List(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigResponse {
    pub categories: Vec<String>,
    pub engines: Vec<Engine>,
    pub locales: Locales,
    pub instance_name: String,
    pub safe_search: i64,
    pub default_locale: String,
    pub version: String,
}

/// Renders a JSON value the way it reads in plain text: strings unquoted.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
