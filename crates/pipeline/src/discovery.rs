//! Trigger event discovery.
//!
//! Scrapes a randomized subset of the configured sources and keeps any page
//! whose text mentions a business trigger keyword. Individual source
//! failures are logged and skipped; a discovery run only fails when there
//! are no sources to scan at all.

use std::sync::Arc;

use emberline_core::{PipelineError, SourceFetcher, TriggerEvent};
use futures::future::join_all;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

/// Signals that a page is worth analyzing for outreach targets.
pub const TRIGGER_KEYWORDS: [&str; 13] = [
    "launch",
    "acquire",
    "funding",
    "partnership",
    "crisis",
    "outage",
    "layoff",
    "regulatory",
    "disruption",
    "competitor",
    "pivot",
    "expansion",
    "restructuring",
];

/// Page text beyond this is never relevant to keyword matching.
pub const SCRAPE_MAX_CHARS: usize = 20_000;

pub struct TriggerDiscovery {
    fetcher: Arc<dyn SourceFetcher>,
    sources: Vec<String>,
}

impl TriggerDiscovery {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, sources: Vec<String>) -> Self {
        Self { fetcher, sources }
    }

    /// Scan up to `max_sources` randomly chosen sources for trigger events.
    pub async fn find_trigger_events(
        &self,
        max_sources: usize,
    ) -> Result<Vec<TriggerEvent>, PipelineError> {
        if self.sources.is_empty() {
            return Err(PipelineError::Discovery(
                "no sources configured".to_string(),
            ));
        }

        let mut picked = self.sources.clone();
        picked.shuffle(&mut rand::rng());
        picked.truncate(max_sources);

        let fetches = picked.iter().map(|source| {
            let fetcher = self.fetcher.clone();
            async move { (source.clone(), fetcher.fetch(source).await) }
        });

        let mut events = Vec::new();
        for (source, result) in join_all(fetches).await {
            match result {
                Ok(text) => {
                    if let Some(event) = Self::match_trigger(&source, &text) {
                        events.push(event);
                    }
                }
                Err(err) => {
                    warn!(source, error = %err, "source fetch failed, skipping");
                }
            }
        }

        debug!(scanned = picked.len(), found = events.len(), "discovery pass complete");
        Ok(events)
    }

    fn match_trigger(source: &str, text: &str) -> Option<TriggerEvent> {
        let capped: String = text.chars().take(SCRAPE_MAX_CHARS).collect();
        let lowered = capped.to_lowercase();
        let hit = TRIGGER_KEYWORDS.iter().find(|kw| lowered.contains(**kw))?;
        debug!(source, keyword = *hit, "trigger keyword matched");
        Some(TriggerEvent::new(source, &capped))
    }
}

/// Plain HTTP page fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("emberline/0.1")
            .build()
            .map_err(|e| PipelineError::Discovery(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(source)
            .send()
            .await
            .map_err(|e| PipelineError::SourceFetch {
                url: source.to_string(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(PipelineError::SourceFetch {
                url: source.to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        response
            .text()
            .await
            .map_err(|e| PipelineError::SourceFetch {
                url: source.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapFetcher {
        pages: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn new(pages: Vec<(&str, Result<&str, &str>)>) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .into_iter()
                    .map(|(k, v)| {
                        (
                            k.to_string(),
                            v.map(str::to_string).map_err(str::to_string),
                        )
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SourceFetcher for MapFetcher {
        async fn fetch(&self, source: &str) -> Result<String, PipelineError> {
            self.calls.lock().unwrap().push(source.to_string());
            match self.pages.get(source) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(reason)) => Err(PipelineError::SourceFetch {
                    url: source.to_string(),
                    reason: reason.clone(),
                }),
                None => Err(PipelineError::SourceFetch {
                    url: source.to_string(),
                    reason: "unknown source".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn keyword_match_yields_event() {
        let fetcher = MapFetcher::new(vec![(
            "https://news.example/a",
            Ok("Acme announced a new Funding round today"),
        )]);
        let discovery =
            TriggerDiscovery::new(fetcher, vec!["https://news.example/a".to_string()]);

        let events = discovery.find_trigger_events(5).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "https://news.example/a");
    }

    #[tokio::test]
    async fn keyword_matching_is_case_insensitive() {
        let fetcher = MapFetcher::new(vec![(
            "s",
            Ok("MAJOR OUTAGE reported across the region"),
        )]);
        let discovery = TriggerDiscovery::new(fetcher, vec!["s".to_string()]);
        assert_eq!(discovery.find_trigger_events(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pages_without_keywords_are_dropped() {
        let fetcher = MapFetcher::new(vec![("s", Ok("nothing interesting here"))]);
        let discovery = TriggerDiscovery::new(fetcher, vec!["s".to_string()]);
        assert!(discovery.find_trigger_events(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_sources_are_skipped_not_fatal() {
        let fetcher = MapFetcher::new(vec![
            ("bad", Err("connection refused")),
            ("good", Ok("a big expansion is underway")),
        ]);
        let discovery = TriggerDiscovery::new(
            fetcher,
            vec!["bad".to_string(), "good".to_string()],
        );

        let events = discovery.find_trigger_events(5).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "good");
    }

    #[tokio::test]
    async fn empty_source_list_is_an_error() {
        let fetcher = MapFetcher::new(vec![]);
        let discovery = TriggerDiscovery::new(fetcher, vec![]);
        assert!(discovery.find_trigger_events(5).await.is_err());
    }

    #[tokio::test]
    async fn max_sources_caps_fetch_count() {
        let fetcher = MapFetcher::new(vec![
            ("a", Ok("x")),
            ("b", Ok("x")),
            ("c", Ok("x")),
        ]);
        let discovery = TriggerDiscovery::new(
            fetcher.clone(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        );

        discovery.find_trigger_events(2).await.unwrap();
        assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn oversized_pages_are_capped_before_matching() {
        let mut text = "x".repeat(SCRAPE_MAX_CHARS);
        text.push_str("funding");
        assert!(TriggerDiscovery::match_trigger("s", &text).is_none());
    }
}
