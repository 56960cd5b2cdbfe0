use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::ScrapeError;

/// How often blocking waits re-check their condition.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One rendered page the scraper drives. Everything a site's navigators and
/// parsers need from the browser goes through here.
pub trait Page {
    fn url(&self) -> String;

    fn navigate(&self, url: &str) -> Result<(), ScrapeError>;

    /// Current markup, after client-side rendering.
    fn content(&self) -> Result<String, ScrapeError>;

    fn click(&self, selector: &str) -> Result<(), ScrapeError>;

    fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Text of every element matching `selector`, in document order.
    fn element_texts(&self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&self.content()?);
        let texts = doc.select(&sel).map(|el| el.text().collect()).collect();
        Ok(texts)
    }

    /// `attr` of the first element matching `selector`. `Ok(None)` when the
    /// element is missing or lacks the attribute.
    fn element_attribute(&self, selector: &str, attr: &str) -> Result<Option<String>, ScrapeError> {
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&self.content()?);
        let value = doc
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr).map(str::to_string));
        Ok(value)
    }

    fn has_element(&self, selector: &str) -> Result<bool, ScrapeError> {
        let sel = parse_selector(selector)?;
        let doc = Html::parse_document(&self.content()?);
        let found = doc.select(&sel).next().is_some();
        Ok(found)
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Browser(format!("bad selector {:?}: {}", selector, e)))
}

/// One Chrome process with a single tab. Chrome is shut down when the session
/// is dropped.
pub struct BrowserSession {
    // Owns the process; the tab dies with it.
    browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(visible: bool, logging: bool, timeout: Duration) -> Result<Self, ScrapeError> {
        let mut args: Vec<&OsStr> = vec![OsStr::new("--disable-gpu"), OsStr::new("--no-sandbox")];
        if logging {
            args.push(OsStr::new("--enable-logging=stderr"));
            args.push(OsStr::new("--v=1"));
        } else {
            args.push(OsStr::new("--log-level=3"));
        }
        let options = LaunchOptions::default_builder()
            .headless(!visible)
            .args(args)
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| ScrapeError::Browser(format!("launch options: {}", e)))?;

        info!("Starting browser session (visible: {})", visible);
        let browser = Browser::new(options).map_err(|e| ScrapeError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(format!("failed to open tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        Ok(BrowserSession { browser, tab })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        info!("Ending browser session");
    }
}

impl Page for BrowserSession {
    fn url(&self) -> String {
        self.tab.get_url()
    }

    fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| ScrapeError::Connectivity {
                url: url.to_string(),
                attempts: 1,
                reason: e.to_string(),
            })
    }

    fn content(&self) -> Result<String, ScrapeError> {
        self.tab.get_content().map_err(|e| {
            let alive = self.browser.get_version().is_ok();
            content_error(alive, self.url(), e.to_string())
        })
    }

    fn click(&self, selector: &str) -> Result<(), ScrapeError> {
        let failed = |e: anyhow::Error| ScrapeError::NavigationFailure {
            url: self.url(),
            reason: format!("could not click {}: {}", selector, e),
        };
        let element = self.tab.find_element(selector).map_err(failed)?;
        element.click().map_err(failed)?;
        Ok(())
    }

    fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| ScrapeError::NavigationFailure {
                url: self.url(),
                reason: format!("{} did not appear within {:?}: {}", selector, timeout, e),
            })
    }
}

/// A content read that fails while Chrome still answers is a slow or broken
/// page, so only that target fails. A session that no longer answers is fatal.
fn content_error(session_alive: bool, url: String, reason: String) -> ScrapeError {
    if session_alive {
        ScrapeError::NavigationFailure {
            url,
            reason: format!("failed to read page content: {}", reason),
        }
    } else {
        ScrapeError::Browser(format!("browser session lost reading {}: {}", url, reason))
    }
}

/// Navigate, retrying failed attempts with exponential backoff.
pub fn navigate_with_retry(
    page: &dyn Page,
    url: &str,
    max_retries: u32,
    backoff: Duration,
) -> Result<(), ScrapeError> {
    let attempts = max_retries.max(1);
    let mut last = String::new();
    for attempt in 0..attempts {
        match page.navigate(url) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                last = e.to_string();
                if attempt + 1 == attempts {
                    break;
                }
                let wait = backoff * 2u32.pow(attempt);
                warn!(
                    "Navigation to {} failed (attempt {}/{}), backing off {:.1}s",
                    url,
                    attempt + 1,
                    attempts,
                    wait.as_secs_f64()
                );
                thread::sleep(wait);
            }
        }
    }
    Err(ScrapeError::Connectivity {
        url: url.to_string(),
        attempts,
        reason: last,
    })
}

/// Block until `condition` holds or `timeout` passes. An error from the
/// condition counts as "not yet".
pub fn poll_until<F>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Result<bool, ScrapeError>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match condition() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => debug!("poll condition not ready: {}", e),
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(interval);
    }
}
