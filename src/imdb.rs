//! Adapter for IMDb user reviews.
//! Listing: https://www.imdb.com/title/tt6751668/reviews
//! More cards: https://www.imdb.com/title/tt6751668/reviews/_ajax?paginationKey=<data-key>
//! Cards come in two layouts (current `review-card-parent` and the older
//! `imdb-user-review`); every field selector lists both.

use reqwest::Url;
use scraper::{Html, Selector};

use crate::{
    ItemElement, ParsedReview, ScrapeError, Site, SiteAdapter, Target, compile, element_text,
    parse_score,
};

const BASE: &str = "https://www.imdb.com";

/// Returns the `tt…` id from a bare id or any IMDb title URL.
fn title_id(locator: &str) -> Option<&str> {
    let is_id = |s: &str| {
        s.len() > 2 && s.starts_with("tt") && s[2..].chars().all(|c| c.is_ascii_digit())
    };
    let locator = locator.trim();
    if is_id(locator) {
        return Some(locator);
    }
    locator.split('/').find(|segment| is_id(segment))
}

pub struct ImdbAdapter {
    card: Selector,
    rating: Selector,
    body: Selector,
    date: Selector,
    author: Selector,
    link: Selector,
    load_more: Selector,
}

impl ImdbAdapter {
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            card: compile("div[data-testid='review-card-parent'], div.imdb-user-review")?,
            rating: compile("span.ipc-rating-star--rating, span.rating-other-user-rating span")?,
            body: compile(
                "div[data-testid='review-overflow'] div.ipc-html-content-inner-div, \
                 div.text.show-more__control",
            )?,
            date: compile("li.review-date, span.review-date")?,
            author: compile("a[data-testid='author-link'], span.display-name-link a")?,
            link: compile("a[href*='/review/']")?,
            load_more: compile("div.load-more-data[data-key]")?,
        })
    }
}

impl SiteAdapter for ImdbAdapter {
    fn site(&self) -> Site {
        Site::Imdb
    }

    fn locator(&self, target: &Target) -> Result<Url, ScrapeError> {
        let id = title_id(&target.locator)
            .ok_or_else(|| ScrapeError::invalid_locator(&target.locator, "no IMDb title id"))?;
        Url::parse(&format!("{}/title/{}/reviews", BASE, id))
            .map_err(|e| ScrapeError::invalid_locator(&target.locator, e.to_string()))
    }

    fn card_selector(&self) -> &Selector {
        &self.card
    }

    fn next_page(&self, page: &Html, current: &Url) -> Option<Url> {
        let key = page
            .select(&self.load_more)
            .next()?
            .value()
            .attr("data-key")?
            .trim();
        if key.is_empty() {
            return None;
        }

        let path = current
            .path()
            .trim_end_matches('/')
            .trim_end_matches("/_ajax")
            .to_string();
        let mut next = current.clone();
        next.set_path(&format!("{}/_ajax", path));
        next.set_query(None);
        next.query_pairs_mut().append_pair("paginationKey", key);
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
            score: first_text(&self.rating).and_then(|r| parse_score(&r)),
            date: first_text(&self.date),
            author: first_text(&self.author),
        }
    }

    fn stable_key(&self, element: &ItemElement) -> Option<String> {
        let doc = element.document();
        let href = doc.select(&self.link).next()?.value().attr("href")?.trim();
        if href.is_empty() {
            return None;
        }
        let href = href.split('?').next().unwrap_or(href);
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

    const CARD: &str = r#"
        <div data-testid="review-card-parent">
          <div class="ipc-list-card__content">
            <span class="ipc-rating-star--rating">9</span><span>/10</span>
            <a href="/review/rw6231524/?ref_=tt_urv_c">Link</a>
            <div data-testid="review-overflow">
              <div class="ipc-html-content-inner-div">A masterpiece.
                Every frame matters.</div>
            </div>
            <ul><li class="review-date">Nov 3, 2019</li></ul>
            <a data-testid="author-link" href="/user/ur1/">cinephile</a>
          </div>
        </div>
    "#;

    const LEGACY_CARD: &str = r#"
        <div class="lister-item imdb-user-review">
          <span class="rating-other-user-rating"><span>4</span><span>/10</span></span>
          <span class="display-name-link"><a href="/user/ur2/">skeptic</a></span>
          <span class="review-date">5 February 2022</span>
          <div class="text show-more__control">Too long by an hour.</div>
        </div>
    "#;

    fn target(locator: &str) -> Target {
        Target {
            site: Site::Imdb,
            locator: locator.to_string(),
            title: "오징어 게임".to_string(),
            title_en: Some("Squid Game".to_string()),
            language: Some("en".to_string()),
            year: Some(2021),
        }
    }

    #[test]
    fn test_locator_accepts_id_or_url() {
        let adapter = ImdbAdapter::new().unwrap();
        let expected = "https://www.imdb.com/title/tt10919420/reviews";
        assert_eq!(adapter.locator(&target("tt10919420")).unwrap().as_str(), expected);
        assert_eq!(
            adapter
                .locator(&target("https://www.imdb.com/title/tt10919420/?ref_=nv_sr"))
                .unwrap()
                .as_str(),
            expected
        );
        assert!(matches!(
            adapter.locator(&target("squid game")),
            Err(ScrapeError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn test_parse_current_layout() {
        let adapter = ImdbAdapter::new().unwrap();
        let element = ItemElement::new(CARD);

        let parsed = adapter.parse_item(&element);

        assert_eq!(parsed.body, "A masterpiece. Every frame matters.");
        assert_eq!(parsed.score, Some(9.0));
        assert_eq!(parsed.date.as_deref(), Some("Nov 3, 2019"));
        assert_eq!(parsed.author.as_deref(), Some("cinephile"));
        assert_eq!(
            adapter.stable_key(&element).as_deref(),
            Some("https://www.imdb.com/review/rw6231524/")
        );
    }

    #[test]
    fn test_parse_legacy_layout_without_link() {
        let adapter = ImdbAdapter::new().unwrap();
        let element = ItemElement::new(LEGACY_CARD);

        let parsed = adapter.parse_item(&element);

        assert_eq!(parsed.body, "Too long by an hour.");
        assert_eq!(parsed.score, Some(4.0));
        assert_eq!(parsed.author.as_deref(), Some("skeptic"));
        assert!(adapter.stable_key(&element).is_none());
    }

    #[test]
    fn test_missing_rating_keeps_item() {
        let adapter = ImdbAdapter::new().unwrap();
        let element = ItemElement::new(
            r#"<div data-testid="review-card-parent">
                 <div data-testid="review-overflow">
                   <div class="ipc-html-content-inner-div">No stars given.</div>
                 </div>
               </div>"#,
        );

        let parsed = adapter.parse_item(&element);

        assert_eq!(parsed.body, "No stars given.");
        assert_eq!(parsed.score, None);
        assert_eq!(parsed.date, None);
    }

    #[test]
    fn test_next_page_from_ajax_page() {
        let adapter = ImdbAdapter::new().unwrap();
        let current =
            Url::parse("https://www.imdb.com/title/tt6751668/reviews/_ajax?paginationKey=old")
                .unwrap();
        let page = Html::parse_document(r#"<div class="load-more-data" data-key="g4w"></div>"#);

        let next = adapter.next_page(&page, &current).unwrap();
        assert_eq!(
            next.as_str(),
            "https://www.imdb.com/title/tt6751668/reviews/_ajax?paginationKey=g4w"
        );

        let last = Html::parse_document(r#"<div class="load-more-data" data-key=""></div>"#);
        assert!(adapter.next_page(&last, &current).is_none());
    }
}
