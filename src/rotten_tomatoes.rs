//! Adapter for Rotten Tomatoes audience reviews.
//! Listing: https://www.rottentomatoes.com/m/parasite_2019/reviews?type=user
//! Cards are `review-card` custom elements and carry no per-review link, so
//! identity is a fingerprint of the date and the start of the body.

use reqwest::Url;
use scraper::{Html, Selector};

use crate::{
    ItemElement, ParsedReview, ScrapeError, Site, SiteAdapter, Target, compile, element_text,
    parse_score,
};

const BASE: &str = "https://www.rottentomatoes.com";

/// Characters of the body used in the fingerprint.
const FINGERPRINT_CHARS: usize = 80;

pub struct RottenTomatoesAdapter {
    card: Selector,
    body: Selector,
    date: Selector,
    audience_score: Selector,
    critics_score: Selector,
    author: Selector,
    load_more: Selector,
}

impl RottenTomatoesAdapter {
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            card: compile("review-card")?,
            body: compile("drawer-more[slot='review'] span[slot='content']")?,
            date: compile("span[slot='timestamp']")?,
            audience_score: compile("[slot='rating'] score-icon-audience")?,
            critics_score: compile("[slot='rating'] score-icon-critics")?,
            author: compile("[slot='name'], rt-link[slot='displayName']")?,
            load_more: compile("rt-button[data-pagemediareviewsmanager='loadMoreBtn']")?,
        })
    }

    fn score(&self, doc: &Html) -> Option<f32> {
        let icon = doc
            .select(&self.audience_score)
            .next()
            .or_else(|| doc.select(&self.critics_score).next())?;
        let value = icon.value();
        // `sentiment` (POSITIVE/NEGATIVE) is the last fallback and has no
        // numeric form.
        ["percentage", "score", "sentiment"]
            .iter()
            .filter_map(|attr| value.attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .and_then(parse_score)
    }
}

impl SiteAdapter for RottenTomatoesAdapter {
    fn site(&self) -> Site {
        Site::RottenTomatoes
    }

    fn locator(&self, target: &Target) -> Result<Url, ScrapeError> {
        let raw = target.locator.trim();
        let absolute = if raw.starts_with("http") {
            raw.to_string()
        } else {
            format!("{}/{}", BASE, raw.trim_start_matches('/'))
        };
        let mut url = Url::parse(&absolute)
            .map_err(|e| ScrapeError::invalid_locator(&target.locator, e.to_string()))?;
        if url.host_str().is_none_or(|h| !h.ends_with("rottentomatoes.com")) {
            return Err(ScrapeError::invalid_locator(
                &target.locator,
                "not a rottentomatoes.com URL",
            ));
        }

        if !url.path().trim_end_matches('/').ends_with("/reviews") {
            let path = format!("{}/reviews", url.path().trim_end_matches('/'));
            url.set_path(&path);
        }
        if !url.query_pairs().any(|(k, _)| k == "type") {
            url.query_pairs_mut().append_pair("type", "user");
        }
        Ok(url)
    }

    fn card_selector(&self) -> &Selector {
        &self.card
    }

    fn next_page(&self, page: &Html, current: &Url) -> Option<Url> {
        let button = page.select(&self.load_more).next()?;
        if button.value().attr("hidden").is_some() {
            return None;
        }
        let cursor = button.value().attr("data-after")?.trim();
        if cursor.is_empty() {
            return None;
        }

        let kept: Vec<(String, String)> = current
            .query_pairs()
            .filter(|(k, _)| k != "after")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut next = current.clone();
        next.set_query(None);
        {
            let mut pairs = next.query_pairs_mut();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("after", cursor);
        }
        Some(next)
    }

    fn parse_item(&self, element: &ItemElement) -> ParsedReview {
        let doc = element.document();
        let first_text = |sel: &Selector| {
            doc.select(sel)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
        };

        ParsedReview {
            body: first_text(&self.body).unwrap_or_default(),
            score: self.score(&doc),
            date: first_text(&self.date),
            author: first_text(&self.author),
        }
    }

    fn stable_key(&self, element: &ItemElement) -> Option<String> {
        let parsed = self.parse_item(element);
        if parsed.body.is_empty() {
            return None;
        }
        let head: String = parsed.body.chars().take(FINGERPRINT_CHARS).collect();
        Some(format!("{}|{}", parsed.date.unwrap_or_default(), head))
    }
}
