//! Ranking orchestrator: resolve the source, fetch the page(s), extract and
//! merge codes, truncate to the requested count.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::sleep;

use crate::error::RankingError;
use crate::extract;
use crate::fetch::{BrowserFetcher, DirectFetcher};
use crate::sources::{RankingType, SiteId, SourceRegistry};

const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(1);

/// One fetched ranking: codes in rank order plus the refresh date the site
/// reported for its data, when recoverable.
#[derive(Debug, Clone)]
pub struct RankingSnapshot {
    pub ranking: RankingType,
    pub codes: Vec<String>,
    pub updated_on: Option<NaiveDate>,
}

/// Fetches ranking snapshots. Owns the HTTP client and browser launcher;
/// holds no state across calls, so one client can serve a whole batch run.
pub struct RankingClient {
    registry: SourceRegistry,
    direct: DirectFetcher,
    browser: BrowserFetcher,
    rate_limit: Duration,
}

impl RankingClient {
    pub fn new() -> Result<Self, RankingError> {
        Self::with_registry(SourceRegistry::default())
    }

    /// Builds a client over an explicit registry. Used by tests to target a
    /// wiremock server.
    pub fn with_registry(registry: SourceRegistry) -> Result<Self, RankingError> {
        Ok(Self {
            registry,
            direct: DirectFetcher::new()?,
            browser: BrowserFetcher::new(),
            rate_limit: DEFAULT_RATE_LIMIT,
        })
    }

    /// Overrides the courtesy delay applied before each fetch.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Parses a ranking key and fetches its snapshot. An unknown key fails
    /// with [`RankingError::UnknownRankingType`] before any network activity.
    pub async fn get_ranking(
        &self,
        key: &str,
        count: usize,
    ) -> Result<RankingSnapshot, RankingError> {
        let ranking: RankingType = key.parse()?;
        self.fetch_ranking(ranking, count).await
    }

    /// Fetches a ranking snapshot, truncated to at most `count` codes.
    pub async fn fetch_ranking(
        &self,
        ranking: RankingType,
        count: usize,
    ) -> Result<RankingSnapshot, RankingError> {
        // Courtesy delay, once per invocation rather than per page.
        sleep(self.rate_limit).await;

        let site = ranking.site();
        let (mut codes, first_page) = match site {
            SiteId::Kabutan => self.fetch_paginated(ranking).await?,
            SiteId::Matsui => {
                let html = self.browser.fetch(&self.registry.url_for(ranking)).await?;
                (extract::extract(site, &html), html)
            }
            SiteId::StockWeather | SiteId::Kabumap => {
                let html = self.direct.fetch(&self.registry.url_for(ranking)).await?;
                (extract::extract(site, &html), html)
            }
        };
        codes.truncate(count);
        let updated_on = extract::update_date(&first_page);
        tracing::info!(ranking = %ranking, codes = codes.len(), "fetched ranking");
        Ok(RankingSnapshot {
            ranking,
            codes,
            updated_on,
        })
    }

    /// Fetches the ranking pages concurrently and reassembles them in
    /// ascending page order regardless of completion order. Any single page
    /// failure fails the whole call; there is no partial result. The first
    /// page's markup is kept for update-date extraction.
    async fn fetch_paginated(
        &self,
        ranking: RankingType,
    ) -> Result<(Vec<String>, String), RankingError> {
        let url1 = self.registry.page_url_for(ranking, 1);
        let url2 = self.registry.page_url_for(ranking, 2);
        let url3 = self.registry.page_url_for(ranking, 3);
        let url4 = self.registry.page_url_for(ranking, 4);
        let (p1, p2, p3, p4) = tokio::try_join!(
            self.direct.fetch(&url1),
            self.direct.fetch(&url2),
            self.direct.fetch(&url3),
            self.direct.fetch(&url4),
        )?;

        let site = ranking.site();
        let per_page = [p1.as_str(), p2.as_str(), p3.as_str(), p4.as_str()]
            .into_iter()
            .map(|page| extract::extract(site, page))
            .collect();
        Ok((merge_pages(per_page), p1))
    }
}

/// Concatenates per-page code sequences (already in ascending page order)
/// and deduplicates across the concatenation keeping the first occurrence.
fn merge_pages(pages: Vec<Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for page in pages {
        for code in page {
            if seen.insert(code.clone()) {
                merged.push(code);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_page_order_and_first_occurrence() {
        // Pages arrive pre-sorted by page number even when fetch completion
        // order differed: page 1 [a, b], page 2 [b, e], page 3 [c, d].
        let pages = vec![
            vec!["1111".to_string(), "2222".to_string()],
            vec!["2222".to_string(), "5555".to_string()],
            vec!["3333".to_string(), "4444".to_string()],
        ];
        assert_eq!(
            merge_pages(pages),
            vec!["1111", "2222", "5555", "3333", "4444"]
        );
    }

    #[test]
    fn merge_of_empty_pages_is_empty() {
        assert!(merge_pages(vec![Vec::new(), Vec::new()]).is_empty());
    }
}
