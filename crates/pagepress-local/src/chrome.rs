use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use pagepress_core::{
    sanitize_filename_default, Error, PrintRequest, RenderBackend, RenderedDocument, Result,
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::title::TitleClient;

/// Whole navigate-extract-print sequence must finish within this window.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
/// Short settle after the load event so late network activity can drain.
const SETTLE_AFTER_LOAD: Duration = Duration::from_millis(500);

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const BODY_TEXT_CHARS: usize = 12_000;

const MM_PER_INCH: f64 = 25.4;
const MARGIN_TOP_MM: f64 = 12.0;
const MARGIN_SIDE_MM: f64 = 12.0;
const MARGIN_BOTTOM_MM: f64 = 16.0;

/// Style override applied before printing: exact colors, keep headers and
/// media in one piece across page breaks, and hide the usual overlay chrome
/// (banners, dialogs, cookie/consent/subscribe prompts).
const PRINT_CSS: &str = r#"
* {
  -webkit-print-color-adjust: exact !important;
  print-color-adjust: exact !important;
}
header, nav, img, svg, video, figure, pre, table {
  break-inside: avoid;
  page-break-inside: avoid;
}
[role="banner"], [role="dialog"], [role="alertdialog"],
[class*="cookie"], [class*="consent"], [class*="subscribe"],
[class*="newsletter"], [class*="banner"], [class*="popup"],
[class*="overlay"], [class*="modal"] {
  display: none !important;
}
"#;

/// Runs in page context: walk the candidate containers, keep the one with the
/// most visible text, fall back to the whole body.
const EXTRACT_TEXT_JS: &str = r#"
(() => {
  const candidates = [
    'article', 'main', 'section', 'div[role="main"]',
    '#content', '.content', '.post', '.article',
  ];
  let best = '';
  for (const sel of candidates) {
    for (const el of document.querySelectorAll(sel)) {
      const text = (el.innerText || '').trim();
      if (text.length > best.length) best = text;
    }
  }
  if (!best && document.body) best = (document.body.innerText || '').trim();
  return best.slice(0, 12000);
})()
"#;

#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
    /// Explicit Chrome/Chromium executable; auto-detected when unset.
    pub chrome_path: Option<String>,
}

/// Renders a page to PDF by driving one headless Chromium instance per
/// request. No pooling: the instance lives for exactly one render.
pub struct ChromeRenderer {
    config: RendererConfig,
    titles: TitleClient,
}

impl ChromeRenderer {
    pub fn new(config: RendererConfig, titles: TitleClient) -> Self {
        Self { config, titles }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        // Sandboxing is disabled for compatibility with containerized
        // deployments; treat the host boundary accordingly.
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(NAVIGATION_TIMEOUT)
            .disable_default_args()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");
        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(Error::Render)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Render(format!("browser launch failed: {e}")))?;

        // The CDP event loop has to be driven for any page call to make
        // progress; it ends when the browser closes.
        let driver = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });

        Ok((browser, driver))
    }

    async fn render_on(&self, browser: &Browser, req: &PrintRequest) -> Result<RenderedDocument> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Render(format!("failed to open page: {e}")))?;

        let headers = serde_json::json!({ "Accept-Language": ACCEPT_LANGUAGE });
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
            .await
            .map_err(|e| Error::Render(format!("failed to set request headers: {e}")))?;

        page.goto(req.url.as_str())
            .await
            .map_err(|e| Error::Render(format!("navigation failed: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| Error::Render(format!("navigation failed: {e}")))?;
        tokio::time::sleep(SETTLE_AFTER_LOAD).await;

        inject_print_style(&page).await?;

        let page_title = page.get_title().await.ok().flatten().unwrap_or_default();
        let body_text = extract_body_text(&page).await?;

        let mut base = page_title.clone();
        if req.use_llm {
            let prompt_text = if body_text.trim().is_empty() {
                page_title.as_str()
            } else {
                body_text.as_str()
            };
            // Optional enhancement: a failing suggestion never fails the
            // render, the page title stays in place.
            match self.titles.suggest(prompt_text, &req.url).await {
                Ok(Some(suggested)) => base = suggested,
                Ok(None) => {}
                Err(e) => debug!("title suggestion failed, keeping page title: {e}"),
            }
        }
        let filename = format!("{}.pdf", sanitize_filename_default(&base));

        let pdf = page
            .pdf(print_params(req))
            .await
            .map_err(|e| Error::Render(format!("pdf generation failed: {e}")))?;

        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }

        Ok(RenderedDocument { pdf, filename })
    }
}

#[async_trait]
impl RenderBackend for ChromeRenderer {
    async fn render(&self, req: &PrintRequest) -> Result<RenderedDocument> {
        let (mut browser, driver) = self.launch().await?;

        let outcome =
            tokio::time::timeout(NAVIGATION_TIMEOUT, self.render_on(&browser, req)).await;

        // Cleanup happens on every exit path before the result propagates.
        if let Err(e) = browser.close().await {
            debug!("browser close failed: {e}");
        }
        let _ = browser.wait().await;
        driver.abort();

        match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Render(format!(
                "navigation timeout after {}s",
                NAVIGATION_TIMEOUT.as_secs()
            ))),
        }
    }
}

async fn inject_print_style(page: &Page) -> Result<()> {
    let css = serde_json::to_string(PRINT_CSS).map_err(|e| Error::Render(e.to_string()))?;
    let js = format!(
        "(() => {{ const s = document.createElement('style'); s.textContent = {css}; \
         (document.head || document.documentElement).appendChild(s); }})()"
    );
    page.evaluate(js)
        .await
        .map_err(|e| Error::Render(format!("failed to inject print styles: {e}")))?;
    Ok(())
}

async fn extract_body_text(page: &Page) -> Result<String> {
    let result = page
        .evaluate(EXTRACT_TEXT_JS)
        .await
        .map_err(|e| Error::Render(format!("text extraction failed: {e}")))?;
    let mut text: String = result.into_value().unwrap_or_default();
    if text.chars().count() > BODY_TEXT_CHARS {
        text = text.chars().take(BODY_TEXT_CHARS).collect();
    }
    Ok(text)
}

fn print_params(req: &PrintRequest) -> PrintToPdfParams {
    let (width_in, height_in) = req.format.paper_size_in();
    PrintToPdfParams::builder()
        .landscape(req.landscape)
        .print_background(req.print_background)
        .scale(req.clamped_scale())
        .paper_width(width_in)
        .paper_height(height_in)
        .margin_top(MARGIN_TOP_MM / MM_PER_INCH)
        .margin_bottom(MARGIN_BOTTOM_MM / MM_PER_INCH)
        .margin_left(MARGIN_SIDE_MM / MM_PER_INCH)
        .margin_right(MARGIN_SIDE_MM / MM_PER_INCH)
        .build()
}
