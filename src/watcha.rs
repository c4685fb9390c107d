//! Adapter for Watcha Pedia comments.
//! Listing: https://pedia.watcha.com/ko-KR/contents/<code>/comments
//! Guests see no comments, so a logged-in `Cookie` has to be supplied via
//! the session settings.

use reqwest::Url;
use scraper::{Html, Selector};

use crate::{
    ItemElement, ParsedReview, ScrapeError, Site, SiteAdapter, Target, compile, element_text,
    parse_score,
};

const BASE: &str = "https://pedia.watcha.com";

/// Placeholder text shown instead of a spoiler comment, whitespace removed.
const SPOILER_MARKERS: [&str; 2] = ["스포일러가있어요", "Thiscommentcontainsspoilers"];

fn is_spoiler_placeholder(body: &str) -> bool {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    SPOILER_MARKERS.iter().any(|m| compact.starts_with(m))
}

pub struct WatchaAdapter {
    card: Selector,
    author: Selector,
    rating: Selector,
    body: Selector,
    link: Selector,
    next: Selector,
}

impl WatchaAdapter {
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            card: compile("li > article")?,
            author: compile("article > a:nth-of-type(1) header > div:nth-of-type(1) p")?,
            rating: compile("article > a:nth-of-type(1) header > div:nth-of-type(2) p")?,
            body: compile("article > a:nth-of-type(2) p")?,
            link: compile("a[href*='/comments/']")?,
            next: compile("a[rel='next']")?,
        })
    }
}

impl SiteAdapter for WatchaAdapter {
    fn site(&self) -> Site {
        Site::Watcha
    }

    fn locator(&self, target: &Target) -> Result<Url, ScrapeError> {
        let raw = target.locator.trim();
        if raw.is_empty() {
            return Err(ScrapeError::invalid_locator(raw, "empty content code"));
        }
        if !raw.starts_with("http") {
            if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ScrapeError::invalid_locator(raw, "not a Watcha content code"));
            }
            let url = format!("{}/ko-KR/contents/{}/comments", BASE, raw);
            return Url::parse(&url)
                .map_err(|e| ScrapeError::invalid_locator(raw, e.to_string()));
        }

        let mut url =
            Url::parse(raw).map_err(|e| ScrapeError::invalid_locator(raw, e.to_string()))?;
        if url.host_str() != Some("pedia.watcha.com") {
            return Err(ScrapeError::invalid_locator(raw, "not a pedia.watcha.com URL"));
        }
        if !url.path().trim_end_matches('/').ends_with("/comments") {
            let path = format!("{}/comments", url.path().trim_end_matches('/'));
            url.set_path(&path);
        }
        Ok(url)
    }

    fn card_selector(&self) -> &Selector {
        &self.card
    }

    fn next_page(&self, page: &Html, current: &Url) -> Option<Url> {
        let href = page.select(&self.next).next()?.value().attr("href")?.trim();
        if href.is_empty() {
            return None;
        }
        current.join(href).ok()
    }

    fn parse_item(&self, element: &ItemElement) -> ParsedReview {
        let doc = element.document();
        let first_text = |sel: &Selector| {
            doc.select(sel)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
        };

        let body = first_text(&self.body)
            .filter(|b| !is_spoiler_placeholder(b))
            .unwrap_or_default();

        ParsedReview {
            body,
            score: first_text(&self.rating).and_then(|r| parse_score(&r)),
            date: None,
            author: first_text(&self.author),
        }
    }

    fn stable_key(&self, element: &ItemElement) -> Option<String> {
        let doc = element.document();
        let href = doc.select(&self.link).next()?.value().attr("href")?.trim();
        if href.is_empty() {
            return None;
        }
        Some(if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", BASE, href)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, body: &str) -> ItemElement {
        ItemElement::new(format!(
            r#"<li><article>
                 <a href="/ko-KR/users/u1">
                   <header>
                     <div><p>관객</p></div>
                     <div><p>4.5</p></div>
                   </header>
                 </a>
                 <a href="/ko-KR/comments/{id}"><p>{body}</p></a>
               </article></li>"#
        ))
    }

    fn target(locator: &str) -> Target {
        Target {
            site: Site::Watcha,
            locator: locator.to_string(),
            title: "폭싹 속았수다".to_string(),
            title_en: Some("When Life Gives You Tangerines".to_string()),
            language: Some("ko".to_string()),
            year: Some(2025),
        }
    }

    #[test]
    fn test_locator_from_code_or_url() {
        let adapter = WatchaAdapter::new().unwrap();
        let expected = "https://pedia.watcha.com/ko-KR/contents/tRZN9zD/comments";
        assert_eq!(adapter.locator(&target("tRZN9zD")).unwrap().as_str(), expected);
        assert_eq!(
            adapter
                .locator(&target("https://pedia.watcha.com/ko-KR/contents/tRZN9zD"))
                .unwrap()
                .as_str(),
            expected
        );
        assert!(adapter.locator(&target("폭싹 속았수다")).is_err());
    }

    #[test]
    fn test_parse_comment_card() {
        let adapter = WatchaAdapter::new().unwrap();
        let element = card("c1", "눈물 없이\n볼 수 없는 드라마");

        let parsed = adapter.parse_item(&element);

        assert_eq!(parsed.body, "눈물 없이 볼 수 없는 드라마");
        assert_eq!(parsed.score, Some(4.5));
        assert_eq!(parsed.author.as_deref(), Some("관객"));
        assert_eq!(
            adapter.stable_key(&element).as_deref(),
            Some("https://pedia.watcha.com/ko-KR/comments/c1")
        );
    }

    #[test]
    fn test_spoiler_placeholder_becomes_empty_body() {
        let adapter = WatchaAdapter::new().unwrap();
        let element = card("c2", "스포일러가 있어요!! <span>보기</span>");

        let parsed = adapter.parse_item(&element);

        assert!(parsed.body.is_empty());
        assert_eq!(parsed.score, Some(4.5));
    }

    #[test]
    fn test_next_page_resolves_relative_link() {
        let adapter = WatchaAdapter::new().unwrap();
        let current = Url::parse("https://pedia.watcha.com/ko-KR/contents/tRZN9zD/comments").unwrap();
        let page = Html::parse_document(r#"<a rel="next" href="?page=2">다음</a>"#);

        assert_eq!(
            adapter.next_page(&page, &current).unwrap().as_str(),
            "https://pedia.watcha.com/ko-KR/contents/tRZN9zD/comments?page=2"
        );
        assert!(adapter.next_page(&Html::parse_document("<p></p>"), &current).is_none());
    }
}
