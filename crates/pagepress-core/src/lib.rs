use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("upstream failed: {0}")]
    Upstream(String),
    #[error("render failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub const DEFAULT_FILENAME: &str = "document";
pub const MAX_FILENAME_CHARS: usize = 120;

pub const SCALE_MIN: f64 = 0.1;
pub const SCALE_MAX: f64 = 2.0;
pub const DEFAULT_SCALE: f64 = 1.0;

/// Page-size presets accepted by the print endpoint. Dimensions follow the
/// CSS paper sizes the rendering engine expects, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    #[serde(rename = "A4", alias = "a4")]
    A4,
    #[serde(rename = "A3", alias = "a3")]
    A3,
    #[serde(rename = "A5", alias = "a5")]
    A5,
    #[serde(rename = "Letter", alias = "letter")]
    Letter,
    #[serde(rename = "Legal", alias = "legal")]
    Legal,
    #[serde(rename = "Tabloid", alias = "tabloid")]
    Tabloid,
}

impl PageFormat {
    /// (width, height) in inches, portrait orientation.
    pub fn paper_size_in(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (8.27, 11.69),
            PageFormat::A3 => (11.69, 16.54),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintRequest {
    pub url: String,
    #[serde(default)]
    pub format: PageFormat,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub landscape: bool,
    #[serde(default = "default_print_background")]
    pub print_background: bool,
    #[serde(default, rename = "useLLM", alias = "useLlm")]
    pub use_llm: bool,
}

fn default_scale() -> f64 {
    DEFAULT_SCALE
}

fn default_print_background() -> bool {
    true
}

impl PrintRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: PageFormat::default(),
            scale: DEFAULT_SCALE,
            landscape: false,
            print_background: true,
            use_llm: false,
        }
    }

    /// Scale bounded to what the rendering engine accepts. Non-finite input
    /// (unreachable via JSON, reachable via the library API) falls back to 1.0.
    pub fn clamped_scale(&self) -> f64 {
        if !self.scale.is_finite() {
            return DEFAULT_SCALE;
        }
        self.scale.clamp(SCALE_MIN, SCALE_MAX)
    }

    /// Copy of the request with the scale clamped in place, so backends
    /// downstream never see an out-of-range value.
    pub fn normalized(mut self) -> Self {
        self.scale = self.clamped_scale();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRequest {
    pub url: String,
}

/// One rendered page: the PDF bytes plus the attachment filename
/// (already sanitized, `.pdf` included). Consumed once, never stored.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pdf: Vec<u8>,
    pub filename: String,
}

#[async_trait::async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(&self, req: &PrintRequest) -> Result<RenderedDocument>;
}

/// True only for absolute URLs with an http or https scheme.
pub fn is_valid_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

fn is_reserved_filename_char(c: char) -> bool {
    matches!(
        c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'
    )
}

/// Make `name` safe to use as a path component / attachment filename.
///
/// Runs of reserved characters and whitespace collapse to a single hyphen,
/// edge hyphens are dropped, and the result is bounded to `max_chars`
/// characters (never splitting a code point). Anything that reduces to
/// nothing becomes `"document"`. Idempotent.
pub fn sanitize_filename(name: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(name.len().min(max_chars.saturating_mul(4)));
    let mut pending_hyphen = false;
    for c in name.chars() {
        if is_reserved_filename_char(c) || c.is_whitespace() {
            pending_hyphen = !out.is_empty();
            continue;
        }
        if pending_hyphen {
            out.push('-');
            pending_hyphen = false;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('-');
    let bounded: String = trimmed.chars().take(max_chars).collect();
    let bounded = bounded.trim_end_matches('-');
    if bounded.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        bounded.to_string()
    }
}

pub fn sanitize_filename_default(name: &str) -> String {
    sanitize_filename(name, MAX_FILENAME_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_urls_pass() {
        assert!(is_valid_url("http://example.com"));
        assert!(is_valid_url("https://example.com/path?q=1#frag"));
        assert!(is_valid_url("http://localhost:3000/api"));
    }

    #[test]
    fn non_http_schemes_fail() {
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("file:///etc/passwd"));
        assert!(!is_valid_url("data:text/html,<h1>hi</h1>"));
        assert!(!is_valid_url("javascript:alert(1)"));
    }

    #[test]
    fn malformed_urls_fail() {
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("/relative/path"));
        assert!(!is_valid_url("http://"));
    }

    #[test]
    fn sanitize_defaults_on_empty_or_reserved_only() {
        assert_eq!(sanitize_filename_default(""), "document");
        assert_eq!(sanitize_filename_default("   "), "document");
        assert_eq!(sanitize_filename_default("***"), "document");
        assert_eq!(sanitize_filename_default("///\\\\"), "document");
    }

    #[test]
    fn sanitize_collapses_runs_to_one_hyphen() {
        assert_eq!(sanitize_filename_default("a/b"), "a-b");
        assert_eq!(sanitize_filename_default("a\\//:*b"), "a-b");
        assert_eq!(sanitize_filename_default("My Great Article"), "My-Great-Article");
        assert_eq!(sanitize_filename_default("report: Q3 * final?"), "report-Q3-final");
    }

    #[test]
    fn sanitize_drops_edge_hyphens() {
        assert_eq!(sanitize_filename_default("  hello  "), "hello");
        assert_eq!(sanitize_filename_default("*hello*"), "hello");
        assert_eq!(sanitize_filename_default("- dashed -"), "dashed");
    }

    #[test]
    fn sanitize_truncates_by_chars() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_filename_default(&long).chars().count(), 120);
        assert_eq!(sanitize_filename("abcdef", 3), "abc");
        // Multi-byte characters count as one each.
        assert_eq!(sanitize_filename("ééééé", 2), "éé");
    }

    #[test]
    fn sanitize_keeps_interior_punctuation() {
        assert_eq!(sanitize_filename_default("a.b,c's"), "a.b,c's");
        assert_eq!(sanitize_filename_default("pre--kept"), "pre--kept");
    }

    #[test]
    fn scale_clamps_both_ways() {
        let mut req = PrintRequest::new("https://example.com");
        req.scale = 10.0;
        assert_eq!(req.clamped_scale(), SCALE_MAX);
        req.scale = -1.0;
        assert_eq!(req.clamped_scale(), SCALE_MIN);
        req.scale = 1.3;
        assert_eq!(req.clamped_scale(), 1.3);
        req.scale = f64::NAN;
        assert_eq!(req.clamped_scale(), DEFAULT_SCALE);
    }

    #[test]
    fn print_request_json_defaults() {
        let req: PrintRequest =
            serde_json::from_str(r#"{"url":"https://example.com"}"#).unwrap();
        assert_eq!(req.format, PageFormat::A4);
        assert_eq!(req.scale, 1.0);
        assert!(!req.landscape);
        assert!(req.print_background);
        assert!(!req.use_llm);
    }

    #[test]
    fn print_request_json_overrides() {
        let req: PrintRequest = serde_json::from_str(
            r#"{"url":"https://example.com","format":"Letter","scale":0.5,
                "landscape":true,"printBackground":false,"useLLM":true}"#,
        )
        .unwrap();
        assert_eq!(req.format, PageFormat::Letter);
        assert_eq!(req.scale, 0.5);
        assert!(req.landscape);
        assert!(!req.print_background);
        assert!(req.use_llm);
    }

    #[test]
    fn page_format_accepts_lowercase_alias() {
        let req: PrintRequest =
            serde_json::from_str(r#"{"url":"https://example.com","format":"a4"}"#).unwrap();
        assert_eq!(req.format, PageFormat::A4);
    }

    proptest! {
        #[test]
        fn sanitize_never_contains_reserved_chars(s in any::<String>()) {
            let out = sanitize_filename_default(&s);
            prop_assert!(!out.chars().any(is_reserved_filename_char));
            prop_assert!(!out.chars().any(char::is_whitespace));
        }

        #[test]
        fn sanitize_is_bounded_and_nonempty(s in any::<String>(), n in 1usize..200) {
            let out = sanitize_filename(&s, n);
            prop_assert!(out.chars().count() <= n.max("document".len()));
            prop_assert!(!out.is_empty());
        }

        #[test]
        fn sanitize_is_idempotent(s in any::<String>()) {
            let once = sanitize_filename_default(&s);
            let twice = sanitize_filename_default(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn is_valid_url_never_panics(s in any::<String>()) {
            let _ = is_valid_url(&s);
        }
    }
}
