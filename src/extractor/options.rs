//! Extractor options and configuration.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Default time an extractor process may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Options handed to a table extractor.
///
/// Only the fields below are recognized; anything else found in an option
/// bag is ignored. How each option affects detection is up to the tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorOptions {
    /// Pages to run detection on
    pub pages: PageSelection,

    /// Detection sensitivity
    pub sensitivity: Option<f32>,

    /// Detection strategy
    pub flavor: Option<Flavor>,

    /// Line scale used by ruling-line detection
    pub line_scale: Option<u32>,

    /// Time limit for one extractor invocation
    pub timeout: Duration,
}

impl ExtractorOptions {
    /// Create new extractor options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Restrict detection to a single page.
    pub fn with_page(mut self, page: u32) -> Self {
        self.pages = PageSelection::Pages(vec![page]);
        self
    }

    /// Set detection sensitivity.
    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    /// Set detection strategy.
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    /// Set line scale.
    pub fn with_line_scale(mut self, scale: u32) -> Self {
        self.line_scale = Some(scale);
        self
    }

    /// Set the invocation time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read options from a JSON object.
    ///
    /// Recognized keys: `pageRange` (or `pages`), `sensitivity`, `flavor`,
    /// `lineScale`, `timeoutSecs`. Unrecognized keys are ignored.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut options = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "pageRange" | "pages" => {
                    options.pages = match value {
                        Value::String(s) => PageSelection::parse(s)
                            .map_err(|e| Error::InvalidOption(format!("{key}: {e}")))?,
                        Value::Number(n) => {
                            let page = n
                                .as_u64()
                                .and_then(|p| u32::try_from(p).ok())
                                .ok_or_else(|| invalid(key, "a page number"))?;
                            PageSelection::Pages(vec![page])
                        }
                        Value::Null => PageSelection::All,
                        _ => return Err(invalid(key, "a page selection string")),
                    };
                }
                "sensitivity" => {
                    let s = value.as_f64().ok_or_else(|| invalid(key, "a number"))?;
                    options.sensitivity = Some(s as f32);
                }
                "flavor" => {
                    let s = value.as_str().ok_or_else(|| invalid(key, "a string"))?;
                    options.flavor = Some(
                        Flavor::parse(s).ok_or_else(|| invalid(key, "`lattice` or `stream`"))?,
                    );
                }
                "lineScale" => {
                    let n = value
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| invalid(key, "a positive integer"))?;
                    options.line_scale = Some(n);
                }
                "timeoutSecs" => {
                    let secs = value
                        .as_f64()
                        .filter(|s| s.is_finite() && *s > 0.0)
                        .ok_or_else(|| invalid(key, "a positive number of seconds"))?;
                    options.timeout = Duration::from_secs_f64(secs);
                }
                _ => log::debug!("ExtractorOptions: ignoring unrecognized option `{}`", key),
            }
        }

        Ok(options)
    }

    /// Read options from a JSON object string.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidOption(format!("option bag is not JSON: {e}")))?;
        match value {
            Value::Object(map) => Self::from_map(&map),
            _ => Err(Error::InvalidOption(
                "option bag must be a JSON object".to_string(),
            )),
        }
    }

    /// Render the recognized options as command-line flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if !matches!(self.pages, PageSelection::All) {
            args.push("--pages".to_string());
            args.push(self.pages.to_string());
        }
        if let Some(sensitivity) = self.sensitivity {
            args.push("--sensitivity".to_string());
            args.push(sensitivity.to_string());
        }
        if let Some(flavor) = self.flavor {
            args.push("--flavor".to_string());
            args.push(flavor.as_str().to_string());
        }
        if let Some(scale) = self.line_scale {
            args.push("--line-scale".to_string());
            args.push(scale.to_string());
        }

        args
    }
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            pages: PageSelection::All,
            sensitivity: None,
            flavor: None,
            line_scale: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn invalid(key: &str, expected: &str) -> Error {
    Error::InvalidOption(format!("`{key}` must be {expected}"))
}

/// Table detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Use ruling lines drawn on the page
    Lattice,
    /// Use whitespace between text
    Stream,
}

impl Flavor {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lattice" => Some(Flavor::Lattice),
            "stream" => Some(Flavor::Stream),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Lattice => "lattice",
            Flavor::Stream => "stream",
        }
    }
}

/// Page selection for detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number is selected.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        // Check for simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid end page")?;
                if start > end {
                    return Err(format!("Invalid page range: {start}-{end}"));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        // Parse comma-separated list with possible ranges
        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid page number")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid page number")?;
                for p in start..=end {
                    if !pages.contains(&p) {
                        pages.push(p);
                    }
                }
            } else {
                let p: u32 = part.parse().map_err(|_| "Invalid page number")?;
                if !pages.contains(&p) {
                    pages.push(p);
                }
            }
        }

        pages.sort();
        Ok(PageSelection::Pages(pages))
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => write!(f, "all"),
            PageSelection::Range(range) => write!(f, "{}-{}", range.start(), range.end()),
            PageSelection::Pages(pages) => {
                let list: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", list.join(","))
            }
        }
    }
}
