//! Ranking types and the static source registry.
//!
//! Every ranking type maps to exactly one (site, URL path) pair. The tables
//! are fixed at compile time; [`SourceRegistry`] only parameterizes the base
//! URLs so tests can point the whole pipeline at a mock server.

use std::fmt;
use std::str::FromStr;

use crate::error::RankingError;

/// A named stock-ranking category, each sourced from one specific site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingType {
    /// 値上がり率 (Kabutan)
    Up,
    /// 値下がり率 (Kabutan)
    Down,
    /// 出来高上位 (Kabutan)
    Volume,
    /// 売買代金上位 (Kabutan)
    TradingValue,
    /// 活況銘柄 (Kabutan)
    Active,
    /// 寄付からの値上がり率 (StockWeather)
    UpFromOpen,
    /// 寄付からの値下がり率 (StockWeather)
    DownFromOpen,
    /// 日中値動き変動率 (Kabumap)
    Volatility,
    /// ティック回数 (Matsui)
    Tick,
}

/// The source site a ranking page is served from. Selects both the fetch
/// strategy and the extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteId {
    Kabutan,
    StockWeather,
    Kabumap,
    Matsui,
}

impl RankingType {
    /// All supported ranking types, in menu order.
    pub const ALL: [RankingType; 9] = [
        RankingType::Up,
        RankingType::Down,
        RankingType::Volume,
        RankingType::TradingValue,
        RankingType::Active,
        RankingType::UpFromOpen,
        RankingType::DownFromOpen,
        RankingType::Volatility,
        RankingType::Tick,
    ];

    /// The stable CLI key for this ranking.
    pub fn key(self) -> &'static str {
        match self {
            RankingType::Up => "up",
            RankingType::Down => "down",
            RankingType::Volume => "volume",
            RankingType::TradingValue => "trading_value",
            RankingType::Active => "active",
            RankingType::UpFromOpen => "up_from_open",
            RankingType::DownFromOpen => "down_from_open",
            RankingType::Volatility => "volatility",
            RankingType::Tick => "tick",
        }
    }

    /// The Japanese name shown in menus and progress output.
    pub fn display_name(self) -> &'static str {
        match self {
            RankingType::Up => "値上がり率",
            RankingType::Down => "値下がり率",
            RankingType::Volume => "出来高上位",
            RankingType::TradingValue => "売買代金上位",
            RankingType::Active => "活況銘柄",
            RankingType::UpFromOpen => "寄付からの値上がり率",
            RankingType::DownFromOpen => "寄付からの値下がり率",
            RankingType::Volatility => "日中値動き変動率",
            RankingType::Tick => "ティック回数",
        }
    }

    /// The short name used in exported watchlist filenames.
    pub fn filename_label(self) -> &'static str {
        match self {
            RankingType::Up => "値上がり",
            RankingType::Down => "値下がり",
            RankingType::Volume => "出来高",
            RankingType::TradingValue => "売買代金",
            RankingType::Active => "活況銘柄",
            RankingType::UpFromOpen => "寄りからの上昇",
            RankingType::DownFromOpen => "寄りからの下落",
            RankingType::Volatility => "値動き変動率",
            RankingType::Tick => "ティック回数",
        }
    }

    /// The site this ranking is scraped from.
    pub fn site(self) -> SiteId {
        match self {
            RankingType::Up
            | RankingType::Down
            | RankingType::Volume
            | RankingType::TradingValue
            | RankingType::Active => SiteId::Kabutan,
            RankingType::UpFromOpen | RankingType::DownFromOpen => SiteId::StockWeather,
            RankingType::Volatility => SiteId::Kabumap,
            RankingType::Tick => SiteId::Matsui,
        }
    }

    /// URL path (including any fixed query) relative to the site base.
    fn path(self) -> &'static str {
        match self {
            RankingType::Up => "/warning/?mode=2_1",
            RankingType::Down => "/warning/?mode=2_2",
            RankingType::Volume => "/warning/volume_ranking",
            RankingType::TradingValue => "/warning/trading_value_ranking",
            RankingType::Active => "/warning/?mode=2_9",
            RankingType::UpFromOpen => "/contents/ranking.aspx?mkt=7&cat=0000&type=2",
            RankingType::DownFromOpen => "/contents/ranking.aspx?mkt=7&cat=0000&type=3",
            RankingType::Volatility => "/servlets/dt/Action?SRC=change%2Fbase",
            RankingType::Tick => "/ranking-tick/index",
        }
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RankingType {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        RankingType::ALL
            .into_iter()
            .find(|r| r.key() == key)
            .ok_or_else(|| RankingError::UnknownRankingType(s.to_string()))
    }
}

/// Read-only table of site base URLs, built once at startup and passed into
/// the orchestrator.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    kabutan: String,
    stockweather: String,
    kabumap: String,
    matsui: String,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_bases(
            "https://kabutan.jp",
            "https://finance.stockweather.co.jp",
            "https://dt.kabumap.com",
            "https://finance.matsui.co.jp",
        )
    }
}

impl SourceRegistry {
    /// Builds a registry with explicit base URLs. Used by tests to target a
    /// wiremock server.
    pub fn with_bases(kabutan: &str, stockweather: &str, kabumap: &str, matsui: &str) -> Self {
        Self {
            kabutan: kabutan.trim_end_matches('/').to_string(),
            stockweather: stockweather.trim_end_matches('/').to_string(),
            kabumap: kabumap.trim_end_matches('/').to_string(),
            matsui: matsui.trim_end_matches('/').to_string(),
        }
    }

    fn base(&self, site: SiteId) -> &str {
        match site {
            SiteId::Kabutan => &self.kabutan,
            SiteId::StockWeather => &self.stockweather,
            SiteId::Kabumap => &self.kabumap,
            SiteId::Matsui => &self.matsui,
        }
    }

    /// The full ranking-page URL for the given ranking type.
    pub fn url_for(&self, ranking: RankingType) -> String {
        format!("{}{}", self.base(ranking.site()), ranking.path())
    }

    /// The URL for one page of a paginated ranking.
    pub fn page_url_for(&self, ranking: RankingType, page: u32) -> String {
        let url = self.url_for(ranking);
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}page={page}")
    }
}
