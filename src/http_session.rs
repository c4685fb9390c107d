//! A [`Session`] over plain HTTP pages.
//!
//! Each "reveal more" fetches the page behind the adapter's next-page
//! affordance and appends its cards, so the visible set grows the same way a
//! "load more" button grows a rendered list.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url, header};
use scraper::Html;
use tracing::debug;

use crate::{ItemElement, RevealOutcome, Session, SessionError, SiteAdapter, Target};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Request settings shared by every session of a run.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub accept_language: String,
    /// Raw `Cookie` header, e.g. a logged-in session for sites that hide
    /// reviews from guests.
    pub cookie: Option<String>,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            cookie: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds the client used by every [`HttpSession`] of a run.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .cookie_store(true)
        .timeout(settings.request_timeout)
        .build()
}

struct PageExtract {
    items: Vec<ItemElement>,
    next: Option<Url>,
}

fn extract_page(adapter: &dyn SiteAdapter, body: &str, url: &Url) -> PageExtract {
    let document = Html::parse_document(body);
    let items = document
        .select(adapter.card_selector())
        .map(|card| ItemElement::new(card.html()))
        .collect();
    let next = adapter.next_page(&document, url);
    PageExtract { items, next }
}

pub struct HttpSession {
    client: Client,
    adapter: Arc<dyn SiteAdapter>,
    settings: HttpSettings,
    current: Option<Url>,
    next: Option<Url>,
    items: Vec<ItemElement>,
    last_page: String,
}

impl HttpSession {
    pub fn new(client: Client, adapter: Arc<dyn SiteAdapter>, settings: HttpSettings) -> Self {
        Self {
            client,
            adapter,
            settings,
            current: None,
            next: None,
            items: Vec::new(),
            last_page: String::new(),
        }
    }

    /// URL of the most recently fetched page.
    pub fn current_url(&self) -> Option<&Url> {
        self.current.as_ref()
    }

    async fn fetch(&self, url: &Url) -> Result<String, SessionError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, self.settings.user_agent.as_str())
            .header(header::ACCEPT_LANGUAGE, self.settings.accept_language.as_str());
        if let Some(cookie) = &self.settings.cookie {
            request = request.header(header::COOKIE, cookie.as_str());
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    fn absorb_page(&mut self, url: Url, body: String) -> usize {
        let page = extract_page(self.adapter.as_ref(), &body, &url);
        let found = page.items.len();
        self.items.extend(page.items);
        self.next = page.next;
        self.current = Some(url);
        self.last_page = body;
        found
    }
}

#[async_trait::async_trait]
impl Session for HttpSession {
    async fn navigate(&mut self, target: &Target) -> Result<(), SessionError> {
        let url = self
            .adapter
            .locator(target)
            .map_err(|e| SessionError::Transient(e.to_string()))?;

        self.items.clear();
        self.next = None;
        self.current = None;
        self.last_page.clear();

        let body = self.fetch(&url).await?;
        let found = self.absorb_page(url, body);
        debug!("Loaded first page of {} with {} cards", target.title, found);
        Ok(())
    }

    async fn visible_items(&mut self) -> Result<Vec<ItemElement>, SessionError> {
        Ok(self.items.clone())
    }

    async fn visible_count(&mut self) -> Result<usize, SessionError> {
        Ok(self.items.len())
    }

    async fn reveal_more(&mut self) -> Result<RevealOutcome, SessionError> {
        let Some(url) = self.next.take() else {
            return Ok(RevealOutcome::Unavailable);
        };

        let body = self.fetch(&url).await?;
        let found = self.absorb_page(url, body);
        debug!("Revealed {} more cards", found);
        Ok(RevealOutcome::Triggered)
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.last_page.clone())
    }
}
