//! Per-site code extraction from raw markup.
//!
//! Each site lays its ranking page out differently, so each gets its own
//! extraction rule. All extractors are pure: deterministic over the given
//! markup, no I/O, and an empty result is just an empty list, not an error.
//! Duplicates are removed keeping the first occurrence, so rank order is
//! document order.
//!
//! The code patterns are deliberately not unified across sites: some anchor
//! the optional uppercase suffix to a delimiter, some do not, and the shapes
//! are not known to be equivalent.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::{Html, Selector};

use crate::sources::SiteId;

/// Extracts the ordered, deduplicated security codes for one page of the
/// given site.
pub fn extract(site: SiteId, html: &str) -> Vec<String> {
    match site {
        SiteId::Kabutan => extract_kabutan(html),
        SiteId::StockWeather => extract_stockweather(html),
        SiteId::Kabumap => extract_kabumap(html),
        SiteId::Matsui => extract_matsui(html),
    }
}

/// Kabutan: stock-detail links carry the code in a `code=` parameter. Only
/// links whose immediate parent is a table cell count; the page header links
/// to stocks too and those must not leak into the ranking.
fn extract_kabutan(html: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"/stock/\?code=(\d{3,4}[A-Z]?)").expect("valid kabutan pattern")
    });

    let doc = Html::parse_document(html);
    let mut codes = Vec::new();
    let mut seen = HashSet::new();
    for link in doc.select(cell_link_selector()) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(cap) = re.captures(href) {
            push_code(&cap[1], &mut codes, &mut seen);
        }
    }
    codes
}

/// StockWeather: stock-detail links carry the code in a `stkcode=` parameter.
fn extract_stockweather(html: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"stockdetail\.aspx.*stkcode=(\d{3,4}[A-Z]?)")
            .expect("valid stockweather pattern")
    });

    let doc = Html::parse_document(html);
    let mut codes = Vec::new();
    let mut seen = HashSet::new();
    for link in doc.select(link_selector()) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(cap) = re.captures(href) {
            push_code(&cap[1], &mut codes, &mut seen);
        }
    }
    codes
}

/// Kabumap: no usable links; scan every cell of the first table for a bare
/// 4-digit token.
fn extract_kabumap(html: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\b(\d{4})\b").expect("valid kabumap pattern"));

    let doc = Html::parse_document(html);
    let Some(table) = doc.select(table_selector()).next() else {
        return Vec::new();
    };
    let mut codes = Vec::new();
    let mut seen = HashSet::new();
    for cell in table.select(cell_selector()) {
        let text = cell_text(&cell);
        if let Some(cap) = re.captures(&text) {
            push_code(&cap[1], &mut codes, &mut seen);
        }
    }
    codes
}

/// Matsui: the first table is decorative; the ranking lives in the second.
/// Codes sit in the second column next to the market segment, so the pattern
/// requires a following whitespace or 東 marker.
fn extract_matsui(html: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"(\d{3,4}[A-Z]?)(?:\s|東)").expect("valid matsui pattern"));

    let doc = Html::parse_document(html);
    let tables: Vec<_> = doc.select(table_selector()).collect();
    let Some(table) = tables.get(1) else {
        return Vec::new();
    };
    let mut codes = Vec::new();
    let mut seen = HashSet::new();
    // First row is the header.
    for row in table.select(row_selector()).skip(1) {
        let cells: Vec<_> = row.select(cell_selector()).collect();
        let Some(cell) = cells.get(1) else {
            continue;
        };
        let text = cell_text(cell);
        if let Some(cap) = re.captures(&text) {
            push_code(&cap[1], &mut codes, &mut seen);
        }
    }
    codes
}

/// True once rendered markup carries Matsui ranking data: the second table
/// exists and has at least one cell row below the header. The table is
/// filled in after the load event, so the browser fetcher polls the
/// rendered document against this until the rows show up.
pub(crate) fn has_matsui_rows(html: &str) -> bool {
    let doc = Html::parse_document(html);
    let tables: Vec<_> = doc.select(table_selector()).collect();
    let Some(table) = tables.get(1) else {
        return false;
    };
    table
        .select(row_selector())
        .skip(1)
        .any(|row| row.select(cell_selector()).next().is_some())
}

/// Reads the site-reported refresh date from the first `<time datetime=…>`
/// element, if any. Missing or unparsable attributes are reported as absent,
/// never as an error.
pub fn update_date(html: &str) -> Option<NaiveDate> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let sel = SEL.get_or_init(|| Selector::parse("time[datetime]").expect("valid selector"));

    let doc = Html::parse_document(html);
    let raw = doc.select(sel).next()?.value().attr("datetime")?;
    parse_date(raw)
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .ok()
        .map(|dt| dt.date())
}

/// Keeps a candidate code if it is long enough and not seen before.
/// Regular codes are at least 4 characters; shorter matches are partial.
fn push_code(code: &str, codes: &mut Vec<String>, seen: &mut HashSet<String>) {
    if code.len() >= 4 && seen.insert(code.to_string()) {
        codes.push(code.to_string());
    }
}

fn cell_text(cell: &scraper::ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a[href]").expect("valid selector"))
}

fn cell_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td > a[href]").expect("valid selector"))
}

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("table").expect("valid selector"))
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("valid selector"))
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").expect("valid selector"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every extractor output must be duplicate-free and shape-valid.
    fn assert_well_formed(codes: &[String]) {
        let shape = Regex::new(r"^\d{3,4}[A-Z]?$").unwrap();
        let mut seen = HashSet::new();
        for code in codes {
            assert!(shape.is_match(code), "bad shape: {code}");
            assert!(code.len() >= 4, "too short: {code}");
            assert!(seen.insert(code), "duplicate: {code}");
        }
    }

    #[test]
    fn kabutan_takes_cell_links_only() {
        let html = r#"
            <html><body>
            <div class="header">
              <a href="/stock/?code=9999">注目銘柄</a>
            </div>
            <table>
              <tr><td><a href="/stock/?code=7203">トヨタ自動車</a></td></tr>
              <tr><td><a href="/stock/?code=6758">ソニーG</a></td></tr>
              <tr><td><a href="/stock/?code=7203">トヨタ自動車</a></td></tr>
              <tr><td><a href="/stock/?code=285A">キオクシアHD</a></td></tr>
              <tr><td><a href="/news/archive">ニュース</a></td></tr>
            </table>
            </body></html>"#;
        let codes = extract(SiteId::Kabutan, html);
        assert_eq!(codes, vec!["7203", "6758", "285A"]);
        assert_well_formed(&codes);
    }

    #[test]
    fn kabutan_drops_short_codes() {
        let html = r#"<table><tr>
            <td><a href="/stock/?code=725">短すぎ</a></td>
            <td><a href="/stock/?code=9101">郵船</a></td>
        </tr></table>"#;
        assert_eq!(extract(SiteId::Kabutan, html), vec!["9101"]);
    }

    #[test]
    fn stockweather_matches_detail_links() {
        let html = r#"
            <table>
              <tr><td><a href="stockdetail.aspx?cntcode=JP&skubun=1&stkcode=8306">三菱UFJ</a></td></tr>
              <tr><td><a href="stockdetail.aspx?cntcode=JP&skubun=1&stkcode=9432">NTT</a></td></tr>
              <tr><td><a href="stockdetail.aspx?cntcode=JP&skubun=1&stkcode=8306">三菱UFJ</a></td></tr>
              <tr><td><a href="ranking.aspx?mkt=7&type=2">次へ</a></td></tr>
            </table>"#;
        let codes = extract(SiteId::StockWeather, html);
        assert_eq!(codes, vec!["8306", "9432"]);
        assert_well_formed(&codes);
    }

    #[test]
    fn kabumap_scans_first_table_only() {
        let html = r#"
            <table>
              <tr><td>1</td><td>7011 三菱重工</td></tr>
              <tr><td>2</td><td>(6146) ディスコ</td></tr>
              <tr><td>3</td><td>7011 三菱重工</td></tr>
            </table>
            <table>
              <tr><td>9999 別テーブル</td></tr>
            </table>"#;
        let codes = extract(SiteId::Kabumap, html);
        assert_eq!(codes, vec!["7011", "6146"]);
        assert_well_formed(&codes);
    }

    #[test]
    fn kabumap_without_table_is_empty() {
        assert!(extract(SiteId::Kabumap, "<html><body>準備中</body></html>").is_empty());
    }

    #[test]
    fn matsui_uses_second_table_and_skips_header() {
        let html = r#"
            <table><tr><td>1001 メニュー</td></tr></table>
            <table>
              <tr><th>順位</th><th>銘柄</th><th>ティック</th></tr>
              <tr><td>1</td><td>トヨタ自動車 7203 東証P</td><td>5000</td></tr>
              <tr><td>2</td><td>キオクシアHD 285A東証P</td><td>4200</td></tr>
              <tr><td>3</td><td>短コード 725 東証S</td><td>3100</td></tr>
              <tr><td>4</td><td>トヨタ自動車 7203 東証P</td><td>2900</td></tr>
            </table>"#;
        let codes = extract(SiteId::Matsui, html);
        assert_eq!(codes, vec!["7203", "285A"]);
        assert_well_formed(&codes);
    }

    #[test]
    fn matsui_with_one_table_is_empty() {
        let html = "<table><tr><td>7203 東証P</td></tr></table>";
        assert!(extract(SiteId::Matsui, html).is_empty());
    }

    #[test]
    fn matsui_rows_absent_until_data_rows_render() {
        // Pre-XHR states of the page: no tables, one decorative table, or
        // the ranking table with only its header row.
        assert!(!has_matsui_rows("<html><body>読み込み中</body></html>"));
        assert!(!has_matsui_rows("<table><tr><td>メニュー</td></tr></table>"));
        assert!(!has_matsui_rows(
            "<table><tr><td>メニュー</td></tr></table>\
             <table><tr><th>順位</th><th>銘柄</th></tr></table>"
        ));
    }

    #[test]
    fn matsui_rows_present_once_data_rows_render() {
        let html = "<table><tr><td>メニュー</td></tr></table>\
             <table><tr><th>順位</th><th>銘柄</th></tr>\
             <tr><td>1</td><td>トヨタ自動車 7203 東証P</td></tr></table>";
        assert!(has_matsui_rows(html));
    }

    #[test]
    fn update_date_from_rfc3339_attribute() {
        let html = r#"<p>更新: <time datetime="2025-01-15T15:30:00+09:00">1月15日</time></p>"#;
        assert_eq!(
            update_date(html),
            Some(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
        );
    }

    #[test]
    fn update_date_absent_or_garbage_is_none() {
        assert_eq!(update_date("<p>更新日不明</p>"), None);
        assert_eq!(update_date(r#"<time datetime="きょう">きょう</time>"#), None);
        assert_eq!(update_date("<time>2025-01-15</time>"), None);
    }

    #[test]
    fn parse_date_accepted_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(parse_date("2025-01-15T15:30:00+09:00"), Some(expected));
        assert_eq!(parse_date("2025-01-15"), Some(expected));
        assert_eq!(parse_date("2025-01-15 15:30"), Some(expected));
        assert_eq!(parse_date("15/01/2025"), None);
    }
}
