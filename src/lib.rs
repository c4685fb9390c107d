pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http_session;
pub mod imdb;
pub mod rotten_tomatoes;
pub mod runner;
pub mod session;
pub mod sink;
pub mod wait;
pub mod watcha;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

pub use collector::{
    Collection, CollectionReport, CollectorConfig, IncrementalCollector, ItemKey, Termination,
};
pub use error::{RunError, ScrapeError, SessionError, SinkError};
pub use session::{ItemElement, RevealOutcome, Session};

/// Review sources with a dedicated adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Imdb,
    RottenTomatoes,
    Watcha,
}

impl Site {
    /// Discriminator written to the `site` column.
    pub fn label(&self) -> &'static str {
        match self {
            Site::Imdb => "IMDB",
            Site::RottenTomatoes => "RT",
            Site::Watcha => "WATCHA",
        }
    }

    /// Lowercase name used in file names and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Site::Imdb => "imdb",
            Site::RottenTomatoes => "rt",
            Site::Watcha => "watcha",
        }
    }

    pub fn adapter(&self) -> Result<Arc<dyn SiteAdapter>, ScrapeError> {
        Ok(match self {
            Site::Imdb => Arc::new(imdb::ImdbAdapter::new()?),
            Site::RottenTomatoes => Arc::new(rotten_tomatoes::RottenTomatoesAdapter::new()?),
            Site::Watcha => Arc::new(watcha::WatchaAdapter::new()?),
        })
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "imdb" => Ok(Site::Imdb),
            "rt" | "rotten_tomatoes" | "rottentomatoes" => Ok(Site::RottenTomatoes),
            "watcha" => Ok(Site::Watcha),
            other => Err(format!("unknown site `{other}`")),
        }
    }
}

/// One title to scrape. Immutable once handed to the runner.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Target {
    pub site: Site,
    /// Site-specific locator: IMDb title id, Rotten Tomatoes reviews URL,
    /// Watcha content code or URL.
    pub locator: String,
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
}

impl Target {
    /// Filesystem-safe identifier, used to key diagnostic snapshots.
    pub fn key(&self) -> String {
        let source = self
            .title_en
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.locator);
        slugify(source)
    }

    /// Name used in progress logs.
    pub fn display_title(&self) -> &str {
        self.title_en.as_deref().unwrap_or(&self.title)
    }
}

/// Fields extracted from one review card. Every field is best effort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReview {
    pub body: String,
    pub score: Option<f32>,
    pub date: Option<String>,
    pub author: Option<String>,
}

/// A review accepted into a [`Collection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub key: ItemKey,
    /// Round in which the review was first seen (0 = initial page).
    pub round: usize,
    pub body: String,
    pub score: Option<f32>,
    pub date: Option<String>,
    pub author: Option<String>,
}

impl Review {
    pub fn new(key: ItemKey, round: usize, parsed: ParsedReview) -> Self {
        Self {
            key,
            round,
            body: parsed.body,
            score: parsed.score,
            date: parsed.date,
            author: parsed.author,
        }
    }

    /// Date the review was published, when the site's date text is parseable.
    pub fn published(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_review_date)
    }
}

/// Per-site strategy: how to reach a target's review list, how to find the
/// cards on a page, how to reveal more and how to read one card.
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> Site;

    /// URL of the first review page for `target`.
    fn locator(&self, target: &Target) -> Result<Url, ScrapeError>;

    /// Selector matching one review card.
    fn card_selector(&self) -> &Selector;

    /// The "reveal more" affordance of a rendered page. `None` when it is
    /// absent or disabled.
    fn next_page(&self, page: &Html, current: &Url) -> Option<Url>;

    fn parse_item(&self, element: &ItemElement) -> ParsedReview;

    /// Stable per-item reference (detail link, or a content fingerprint).
    fn stable_key(&self, element: &ItemElement) -> Option<String>;
}

pub(crate) fn compile(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        css: css.to_string(),
        reason: e.to_string(),
    })
}

/// Text of an element with every whitespace run collapsed to one space.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase alphanumerics, everything else becomes a single `_`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Parses a leading number out of strings like `"9/10"`, `"4.5"` or `"80%"`.
pub(crate) fn parse_score(raw: &str) -> Option<f32> {
    let head = raw.split('/').next()?.trim().trim_end_matches('%').trim();
    if head.is_empty() {
        return None;
    }
    head.parse::<f32>().ok().filter(|v| v.is_finite())
}

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y. %m. %d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

pub fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim().trim_end_matches('.');
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
