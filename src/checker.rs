use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use crate::config::{BrowserConfig, PollConfig, SiteConfig, Target};
use crate::error::{AppError, Result};
use crate::slots::{self, Slot};

// The page is ready for querying once the schedule table and at least one
// status icon have rendered.
const STATUS_ICONS: &str =
    r#"svg[aria-label="予約可能"], svg[aria-label="空き無"], svg[aria-label="時間外"]"#;
const NEXT_PERIOD_BUTTON: &str = r#"input[value="2週後＞"]"#;

/// Drives a headless browser through the paginated schedule, one poll cycle
/// at a time. A fresh browser is launched per cycle and dropped with it, so
/// a crashed or wedged Chrome never outlives the cycle that hit it.
pub struct SlotChecker {
    site: SiteConfig,
    browser: BrowserConfig,
    poll: PollConfig,
    target: Target,
}

impl SlotChecker {
    pub fn new(site: SiteConfig, browser: BrowserConfig, poll: PollConfig, target: Target) -> Self {
        Self {
            site,
            browser,
            poll,
            target,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// One poll cycle: load the booking page, then page forward until slots
    /// are found or the page budget runs out. The whole cycle runs under a
    /// deadline; exceeding it is a fatal error for the cycle.
    pub async fn check_availability(&self) -> Result<Vec<Slot>> {
        let deadline = Duration::from_secs(self.browser.cycle_timeout_secs);
        match tokio::time::timeout(deadline, self.run_cycle()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::CycleTimeout {
                seconds: self.browser.cycle_timeout_secs,
            }),
        }
    }

    async fn run_cycle(&self) -> Result<Vec<Slot>> {
        let start = Instant::now();
        let browser = self.launch_browser()?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        let result = self.scan_pages(&tab, start).await;

        // Close tab to free resources
        let _ = tab.close(true);
        result
    }

    async fn scan_pages(&self, tab: &Tab, start: Instant) -> Result<Vec<Slot>> {
        self.load_with_retry(tab).await?;

        let mut page: u32 = 1;
        loop {
            debug!("Checking page {}/{}", page, self.poll.max_pages);
            self.wait_for_schedule(tab)?;
            tokio::time::sleep(Duration::from_millis(self.browser.page_settle_ms)).await;

            let html = tab
                .get_content()
                .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))?;
            let found = slots::extract_slots(&html, &self.target, slots::today_in_tokyo());

            if !found.is_empty() {
                info!(
                    "Found {} available slots: {} (page {}, {:.1}s)",
                    found.len(),
                    slots::date_summary(&found),
                    page,
                    start.elapsed().as_secs_f64()
                );
                return Ok(found);
            }

            if page >= self.poll.max_pages {
                break;
            }
            if !self.next_period_enabled(tab)? {
                debug!("Next period control disabled, no more pages");
                break;
            }
            self.click_next_period(tab)?;
            page += 1;
        }

        info!(
            "No slots found (checked {} pages in {:.1}s)",
            page,
            start.elapsed().as_secs_f64()
        );
        Ok(Vec::new())
    }

    /// Initial navigation, retried with quadratic backoff. Exhausting the
    /// attempts is fatal for the cycle.
    async fn load_with_retry(&self, tab: &Tab) -> Result<()> {
        let attempts = self.browser.navigation_attempts.max(1);
        let delays = quadratic_delays().take(attempts as usize - 1);

        // The cycle future crosses a task spawn, so the counter has to be Sync
        let attempt = AtomicU32::new(0);
        Retry::spawn(delays, || {
            let n = attempt.fetch_add(1, Ordering::Relaxed) + 1;
            if n > 1 {
                warn!("Retrying page load (attempt {}/{})", n, attempts);
            }
            self.load_schedule_page(tab)
        })
        .await
        .map_err(|e| AppError::PageLoad {
            attempts,
            message: e.to_string(),
        })
    }

    async fn load_schedule_page(&self, tab: &Tab) -> Result<()> {
        tab.navigate_to(&self.site.booking_url)
            .map_err(|e| AppError::Browser(format!("Navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| AppError::Browser(format!("Page load failed: {}", e)))?;
        self.wait_for(tab, slots::SCHEDULE_TABLE)?;
        Ok(())
    }

    fn wait_for_schedule(&self, tab: &Tab) -> Result<()> {
        self.wait_for(tab, slots::SCHEDULE_TABLE)?;
        self.wait_for(tab, STATUS_ICONS)?;
        Ok(())
    }

    fn wait_for<'a>(&self, tab: &'a Tab, selector: &str) -> Result<Element<'a>> {
        tab.wait_for_element_with_custom_timeout(
            selector,
            Duration::from_secs(self.browser.element_timeout_secs),
        )
        .map_err(|e| {
            debug!("Wait for selector '{}' failed: {}", selector, e);
            AppError::ElementNotFound {
                selector: selector.to_string(),
            }
        })
    }

    /// Whether the "2週後＞" control can advance to the next two-week page.
    /// A disabled control is the normal end of pagination; a missing one
    /// means the page did not render and is an error.
    fn next_period_enabled(&self, tab: &Tab) -> Result<bool> {
        let button = tab.find_element(NEXT_PERIOD_BUTTON).map_err(|e| {
            debug!("Next period control missing: {}", e);
            AppError::ElementNotFound {
                selector: NEXT_PERIOD_BUTTON.to_string(),
            }
        })?;

        let attributes = button
            .get_attributes()
            .map_err(|e| AppError::Browser(format!("Failed to read next period control: {}", e)))?
            .unwrap_or_default();
        Ok(!has_disabled_attribute(&attributes))
    }

    fn click_next_period(&self, tab: &Tab) -> Result<()> {
        let button = tab.find_element(NEXT_PERIOD_BUTTON).map_err(|e| {
            debug!("Next period control missing: {}", e);
            AppError::ElementNotFound {
                selector: NEXT_PERIOD_BUTTON.to_string(),
            }
        })?;
        button
            .click()
            .map_err(|e| AppError::Browser(format!("Failed to click next period: {}", e)))?;
        self.wait_for(tab, slots::SCHEDULE_TABLE)?;
        Ok(())
    }

    fn launch_browser(&self) -> Result<Browser> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((self.browser.window_width, self.browser.window_height)))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-backgrounding-occluded-windows"),
                OsStr::new("--disable-renderer-backgrounding"),
                // The booking site rejects cross-site requests without these.
                OsStr::new("--disable-web-security"),
                OsStr::new("--disable-site-isolation-trials"),
                OsStr::new("--disable-features=SameSiteByDefaultCookies,CookiesWithoutSameSiteMustBeSecure"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &self.browser.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))
    }
}

/// Delay before re-running attempt n+1: n squared seconds.
fn quadratic_delays() -> impl Iterator<Item = Duration> {
    (1u64..).map(|n| Duration::from_secs(n * n))
}

/// Attributes arrive as interleaved name/value pairs.
fn has_disabled_attribute(attributes: &[String]) -> bool {
    attributes.chunks_exact(2).any(|kv| kv[0] == "disabled")
}
