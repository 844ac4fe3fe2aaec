//! Natural-language search delegated to a generative-text service.
//!
//! The remote answer is untrusted: anything other than a JSON array of ids
//! (after trimming surrounding prose or code fences) is treated as a failure,
//! and every failure falls back to plain substring search.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::Catalog;
use crate::filter::ListingFilter;
use crate::model::ContentRecord;
use crate::search::text_search;

pub const DEFAULT_TIMEOUT_SECS: u64 = 8;
const SYNOPSIS_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("semantic backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("semantic backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("semantic backend returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("semantic backend returned no text")]
    EmptyResponse,
    #[error("semantic backend output is not a JSON id list: {0}")]
    Unparsable(String),
}

#[async_trait]
pub trait SemanticBackend: Send + Sync {
    /// Sends one prompt and returns the raw generated text.
    async fn complete(&self, prompt: &str) -> Result<String, SemanticError>;
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self { enabled: false, endpoint: None, api_key: None, timeout_secs: DEFAULT_TIMEOUT_SECS }
    }
}

/// HTTP backend speaking the `generateContent` request shape.
#[derive(Debug, Clone)]
pub struct GenerativeBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl GenerativeBackend {
    pub fn new(endpoint: &str, api_key: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let mut endpoint = Url::parse(endpoint)?;
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            endpoint.query_pairs_mut().append_pair("key", key);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("showcase/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SemanticBackend for GenerativeBackend {
    async fn complete(&self, prompt: &str) -> Result<String, SemanticError> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let resp = self.client.post(self.endpoint.clone()).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(SemanticError::Status(resp.status()));
        }
        let v: Value = resp.json().await?;
        response_text(&v)
    }
}

/// Concatenates `candidates[0].content.parts[*].text`.
fn response_text(reply: &Value) -> Result<String, SemanticError> {
    let text: String = reply
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(SemanticError::EmptyResponse);
    }
    Ok(text)
}

pub fn build_prompt(records: &[ContentRecord], query: &str) -> String {
    let catalog: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "title": r.title,
                "genres": r.genre,
                "synopsis": r.synopsis.chars().take(SYNOPSIS_CHARS).collect::<String>(),
            })
        })
        .collect();
    format!(
        "You are the search assistant of a movie and TV catalog.\n\
         Catalog (JSON): {}\n\
         User query: \"{}\"\n\
         Answer with ONLY a JSON array of the ids of matching items, most relevant first. \
         Answer [] if nothing matches.",
        Value::Array(catalog),
        query.trim()
    )
}

/// Extracts the id list from free-form model output: the first JSON array of
/// strings, tried at each `[` so bracketed prose before or after it is skipped.
pub fn parse_id_list(text: &str) -> Result<Vec<String>, SemanticError> {
    let trimmed = text.trim();
    let ids = trimmed
        .match_indices('[')
        .find_map(|(at, _)| {
            serde_json::Deserializer::from_str(&trimmed[at..])
                .into_iter::<Vec<String>>()
                .next()
                .and_then(Result::ok)
        })
        .ok_or_else(|| SemanticError::Unparsable(snippet(trimmed)))?;
    Ok(ids
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn snippet(s: &str) -> String {
    s.chars().take(80).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticOutcome<'a> {
    pub results: Vec<&'a ContentRecord>,
    /// True when the substring fallback produced `results`.
    pub fell_back: bool,
}

/// Asks the backend to rank the catalog, preserving the returned order.
/// Unknown and repeated ids are dropped; any failure yields substring search.
pub async fn semantic_search<'a>(
    backend: &dyn SemanticBackend,
    catalog: &'a Catalog,
    query: &str,
    filter: &ListingFilter,
    timeout: Duration,
) -> SemanticOutcome<'a> {
    let fallback = || SemanticOutcome { results: text_search(catalog.records(), query, filter), fell_back: true };
    if query.trim().is_empty() {
        return fallback();
    }

    let prompt = build_prompt(catalog.records(), query);
    let reply = match tokio::time::timeout(timeout, backend.complete(&prompt)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(error = %e, "semantic search failed; using substring search");
            return fallback();
        }
        Err(_) => {
            warn!(error = %SemanticError::Timeout(timeout), "semantic search failed; using substring search");
            return fallback();
        }
    };

    let ids = match parse_id_list(&reply) {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "semantic search failed; using substring search");
            return fallback();
        }
    };

    let mut seen = HashSet::new();
    let results: Vec<&ContentRecord> = ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| catalog.get(id))
        .filter(|r| filter.matches(r))
        .collect();
    debug!(returned = ids.len(), resolved = results.len(), "semantic search answered");
    SemanticOutcome { results, fell_back: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentType;
    use crate::testutil::{catalog_of, record};

    struct Canned(Result<&'static str, ()>);

    #[async_trait]
    impl SemanticBackend for Canned {
        async fn complete(&self, _prompt: &str) -> Result<String, SemanticError> {
            match self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(()) => Err(SemanticError::EmptyResponse),
            }
        }
    }

    struct Stalled;

    #[async_trait]
    impl SemanticBackend for Stalled {
        async fn complete(&self, _prompt: &str) -> Result<String, SemanticError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("[\"heat\"]".into())
        }
    }

    fn catalog() -> Catalog {
        let mut heat = record("Heat", ContentType::Movie, 0);
        heat.genre = vec!["Crime".into()];
        let mut dark = record("Dark", ContentType::TvShow, 0);
        dark.genre = vec!["Science Fiction".into()];
        let alien = record("Alien", ContentType::Movie, 1);
        catalog_of(vec![heat, dark, alien])
    }

    fn titles(o: &SemanticOutcome<'_>) -> Vec<String> {
        o.results.iter().map(|r| r.title.clone()).collect()
    }

    #[test]
    fn id_lists_are_extracted_from_prose() {
        assert_eq!(parse_id_list("```json\n[\"a\", \"b\"]\n```").unwrap(), vec!["a", "b"]);
        assert_eq!(parse_id_list("Sure! [\" x \", \"\"]").unwrap(), vec!["x"]);
        assert!(parse_id_list("no idea").is_err());
        assert!(parse_id_list("[oops").is_err());
        assert!(parse_id_list("[1, 2]").is_err());
    }

    #[test]
    fn bracketed_prose_around_the_answer_is_skipped() {
        assert_eq!(parse_id_list("Based on [your query], matches: [\"heat\"]").unwrap(), vec!["heat"]);
        assert_eq!(parse_id_list("[\"heat\"] (see note [1])").unwrap(), vec!["heat"]);
        assert_eq!(parse_id_list("note [1] then [\"dark\", \"heat\"]").unwrap(), vec!["dark", "heat"]);
        assert!(parse_id_list("nothing [here]").is_err());
    }

    #[test]
    fn reply_text_joins_first_candidate_parts() {
        let reply = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "[\"heat\"," }, { "inlineData": {} }, { "text": " \"dark\"]" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(response_text(&reply).unwrap(), "[\"heat\", \"dark\"]");
    }

    #[test]
    fn reply_without_text_is_empty() {
        let missing = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(response_text(&missing), Err(SemanticError::EmptyResponse)));
        let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert!(matches!(response_text(&blank), Err(SemanticError::EmptyResponse)));
    }

    #[test]
    fn prompt_truncates_synopsis() {
        let mut r = record("Long", ContentType::Movie, 0);
        r.synopsis = "x".repeat(500);
        let prompt = build_prompt(std::slice::from_ref(&r), "long");
        assert!(prompt.contains(&"x".repeat(SYNOPSIS_CHARS)));
        assert!(!prompt.contains(&"x".repeat(SYNOPSIS_CHARS + 1)));
    }

    #[tokio::test]
    async fn keeps_backend_order_and_drops_unknown_ids() {
        let cat = catalog();
        let backend = Canned(Ok("[\"alien\", \"nope\", \"heat\", \"alien\"]"));
        let out = semantic_search(&backend, &cat, "scary space", &ListingFilter::default(), Duration::from_secs(1)).await;
        assert!(!out.fell_back);
        assert_eq!(titles(&out), ["Alien", "Heat"]);
    }

    #[tokio::test]
    async fn failures_fall_back_to_substring_search() {
        let cat = catalog();
        let filter = ListingFilter::default();
        let expected: Vec<String> = text_search(cat.records(), "heat", &filter).iter().map(|r| r.title.clone()).collect();

        for backend in [Canned(Err(())), Canned(Ok("I cannot help with that"))] {
            let out = semantic_search(&backend, &cat, "heat", &filter, Duration::from_secs(1)).await;
            assert!(out.fell_back);
            assert_eq!(titles(&out), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_fall_back() {
        let cat = catalog();
        let out = semantic_search(&Stalled, &cat, "dark", &ListingFilter::default(), Duration::from_secs(2)).await;
        assert!(out.fell_back);
        assert_eq!(titles(&out), ["Dark"]);
    }
}
