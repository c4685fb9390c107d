use scraper::Html;

use crate::{SessionError, Target};

/// Raw markup of one rendered review card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemElement {
    html: String,
}

impl ItemElement {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parses the card as a standalone fragment. Keep the result out of any
    /// `.await`; `Html` is not `Send`.
    pub fn document(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}

/// Result of asking a session to reveal more items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The reveal action was performed; new items may or may not follow.
    Triggered,
    /// No usable "reveal more" affordance: content is exhausted.
    Unavailable,
}

/// Live handle to a paginated review source, exclusively owned by the
/// collecting task.
#[async_trait::async_trait]
pub trait Session: Send {
    /// Load the first page for `target`, discarding previous state.
    async fn navigate(&mut self, target: &Target) -> Result<(), SessionError>;

    /// Every item element currently rendered, in page order.
    async fn visible_items(&mut self) -> Result<Vec<ItemElement>, SessionError>;

    /// Trigger the "reveal more" action once.
    async fn reveal_more(&mut self) -> Result<RevealOutcome, SessionError>;

    /// Raw page state, for diagnostics only.
    async fn page_source(&mut self) -> Result<String, SessionError>;

    /// Size of the current frontier.
    async fn visible_count(&mut self) -> Result<usize, SessionError> {
        Ok(self.visible_items().await?.len())
    }
}
