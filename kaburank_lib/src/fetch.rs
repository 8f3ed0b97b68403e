//! Page fetchers: plain HTTP for most sites, a scripted browser for the one
//! site that blocks non-browser clients.

use std::ffi::OsStr;
use std::time::{Duration, Instant};

use encoding_rs::Encoding;
use headless_chrome::{Browser, LaunchOptions};
use reqwest::header::CONTENT_TYPE;

use crate::error::RankingError;

/// Fixed desktop-browser user agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DIRECT_TIMEOUT: Duration = Duration::from_secs(30);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const RENDER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Direct HTTP fetcher with a shared client, fixed user agent, and a 30 s
/// timeout. Bodies are decoded with charset detection because two of the
/// sites serve Shift_JIS.
#[derive(Clone)]
pub struct DirectFetcher {
    http: reqwest::Client,
}

impl DirectFetcher {
    pub fn new() -> Result<Self, RankingError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DIRECT_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// Fetches one URL and returns the decoded markup. Non-success statuses
    /// and transport errors fail the call; there is no retry.
    pub async fn fetch(&self, url: &str) -> Result<String, RankingError> {
        tracing::debug!(url, "fetching page");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::error!(url, %status, "request failed");
            return Err(RankingError::HttpStatus { status });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = resp.bytes().await?;
        Ok(decode_body(&bytes, content_type.as_deref()))
    }
}

/// Scripted-browser fetcher for Matsui, which rejects plain HTTP clients.
///
/// Each fetch launches an isolated Chrome session with a spoofed user agent,
/// `ja-JP` locale, and the blink automation flag disabled, navigates, waits
/// for the page's network activity to settle (the ranking table is filled by
/// XHR after the load event), and returns the rendered document. The session
/// is torn down when the [`Browser`] handle drops, on success and error
/// paths alike.
#[derive(Clone)]
pub struct BrowserFetcher {
    timeout: Duration,
}

impl Default for BrowserFetcher {
    fn default() -> Self {
        Self {
            timeout: NAVIGATION_TIMEOUT,
        }
    }
}

impl BrowserFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fetch(&self, url: &str) -> Result<String, RankingError> {
        tracing::debug!(url, "fetching page via browser session");
        let url = url.to_string();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || fetch_rendered(&url, timeout))
            .await
            .map_err(|e| RankingError::Browser(e.to_string()))?
    }
}

fn fetch_rendered(url: &str, timeout: Duration) -> Result<String, RankingError> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .window_size(Some((1920, 1080)))
        .args(vec![
            // Hides navigator.webdriver, which the site checks for.
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--no-sandbox"),
        ])
        .build()
        .map_err(browser_err)?;

    let browser = Browser::new(options).map_err(browser_err)?;
    let tab = browser.new_tab().map_err(browser_err)?;
    tab.set_default_timeout(timeout);
    tab.set_user_agent(USER_AGENT, Some("ja-JP"), None)
        .map_err(browser_err)?;
    tab.navigate_to(url).map_err(browser_err)?;
    tab.wait_until_navigated().map_err(browser_err)?;

    // The load event fires before the ranking XHR lands, so poll the
    // rendered document until the data rows exist. Timing out here is a
    // fetch failure, same as a navigation timeout.
    let deadline = Instant::now() + timeout;
    loop {
        let html = tab.get_content().map_err(browser_err)?;
        if crate::extract::has_matsui_rows(&html) {
            return Ok(html);
        }
        if Instant::now() >= deadline {
            return Err(RankingError::Browser(
                "timed out waiting for ranking rows to render".to_string(),
            ));
        }
        std::thread::sleep(RENDER_POLL_INTERVAL);
    }
}

fn browser_err(e: impl std::fmt::Display) -> RankingError {
    RankingError::Browser(e.to_string())
}

/// Decodes a response body: charset from the Content-Type header, else a
/// `<meta charset>` sniff over the document head, else UTF-8.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .or_else(|| sniff_meta_charset(bytes))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_from_content_type(value: &str) -> Option<&'static Encoding> {
    let lower = value.to_ascii_lowercase();
    let rest = &lower[lower.find("charset=")? + "charset=".len()..];
    let label = rest
        .split(|c: char| c == ';' || c.is_whitespace())
        .next()?
        .trim_matches('"');
    Encoding::for_label(label.as_bytes())
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let rest = &head[head.find("charset=")? + "charset=".len()..];
    let label: String = rest
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    Encoding::for_label(label.as_bytes())
}
