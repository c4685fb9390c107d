//! Incremental collection of review cards from a paginated session.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::diagnostics::DebugDumper;
use crate::wait::{WaitPolicy, wait_for_count};
use crate::{ItemElement, Review, RevealOutcome, Session, SessionError, SiteAdapter, Target};

/// Log a progress line every this many collected reviews.
const PROGRESS_EVERY: usize = 50;

/// Budgets for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub max_items: usize,
    /// Maximum number of reveal actions.
    pub max_rounds: usize,
    /// Bounds both the initial load and the growth after each reveal.
    pub wait: WaitPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_items: 1000,
            max_rounds: 100,
            wait: WaitPolicy::default(),
        }
    }
}

/// Identity of a collected item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    /// Stable reference exposed by the page (detail link or fingerprint).
    Reference(String),
    /// Fallback for items without one. Unique within a run only.
    Position { round: usize, position: usize },
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Reference(r) => f.write_str(r),
            ItemKey::Position { round, position } => write!(f, "idx-{}-{}", round, position),
        }
    }
}

/// Append-only, de-duplicated reviews of one target in order of first sight.
#[derive(Debug, Default)]
pub struct Collection {
    reviews: Vec<Review>,
    seen: HashSet<ItemKey>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.seen.contains(key)
    }

    /// Adds `review` unless its key was already seen.
    pub fn insert(&mut self, review: Review) -> bool {
        if !self.seen.insert(review.key.clone()) {
            return false;
        }
        self.reviews.push(review);
        true
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn into_reviews(self) -> Vec<Review> {
        self.reviews
    }
}

/// Why collection for a target stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Termination {
    NoInitialContent,
    MaxItems,
    MaxRounds,
    RevealUnavailable,
    Stagnated,
    RevealFailed(String),
    /// Reading the rendered items failed; no reveal was involved.
    ReadFailed(String),
    SessionClosed(String),
    NavigationFailed(String),
}

impl Termination {
    /// Only a lost session stops the remaining targets.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Termination::SessionClosed(_))
    }

    fn reveal_failed(e: SessionError) -> Self {
        match e {
            SessionError::Closed(msg) => Termination::SessionClosed(msg),
            SessionError::Transient(msg) => Termination::RevealFailed(msg),
        }
    }

    fn read_failed(e: SessionError) -> Self {
        match e {
            SessionError::Closed(msg) => Termination::SessionClosed(msg),
            SessionError::Transient(msg) => Termination::ReadFailed(msg),
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::NoInitialContent => f.write_str("no review items found"),
            Termination::MaxItems => f.write_str("max items reached"),
            Termination::MaxRounds => f.write_str("max reveal rounds reached"),
            Termination::RevealUnavailable => f.write_str("no more content to reveal"),
            Termination::Stagnated => f.write_str("item count stopped growing"),
            Termination::RevealFailed(e) => write!(f, "reveal failed: {}", e),
            Termination::ReadFailed(e) => write!(f, "reading items failed: {}", e),
            Termination::SessionClosed(e) => write!(f, "session closed: {}", e),
            Termination::NavigationFailed(e) => write!(f, "navigation failed: {}", e),
        }
    }
}

/// Finalized outcome of collecting one target.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub target: Target,
    pub reviews: Vec<Review>,
    pub termination: Termination,
    /// Reveal actions performed.
    pub rounds: usize,
    /// Frontier when collection stopped.
    pub visible: usize,
}

impl CollectionReport {
    /// Report for a target whose page never opened. A closed session stays
    /// fatal so the caller stops the run.
    pub fn navigation_failed(target: &Target, error: &SessionError) -> Self {
        let termination = match error {
            SessionError::Closed(msg) => Termination::SessionClosed(msg.clone()),
            SessionError::Transient(msg) => Termination::NavigationFailed(msg.clone()),
        };
        Self {
            target: target.clone(),
            reviews: Vec::new(),
            termination,
            rounds: 0,
            visible: 0,
        }
    }
}

pub struct IncrementalCollector {
    config: CollectorConfig,
    dumper: DebugDumper,
}

impl IncrementalCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            dumper: DebugDumper::disabled(),
        }
    }

    pub fn with_diagnostics(mut self, dumper: DebugDumper) -> Self {
        self.dumper = dumper;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collects as many reviews as the budgets allow from a session already
    /// positioned on `target`. Never fails: every problem becomes a
    /// [`Termination`].
    pub async fn collect<S>(
        &self,
        session: &mut S,
        adapter: &dyn SiteAdapter,
        target: &Target,
    ) -> CollectionReport
    where
        S: Session + ?Sized,
    {
        let title = target.display_title();
        let mut collection = Collection::new();
        let mut rounds = 0;
        let mut frontier = 0;

        let termination = 'collect: {
            match wait_for_count(session, 0, &self.config.wait).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!("[{}] {} - no review items found, skipping", target.site, title);
                    self.dumper.snapshot(session, target, "no_items").await;
                    break 'collect Termination::NoInitialContent;
                }
                Err(e) => break 'collect Termination::read_failed(e),
            }
            self.dumper.snapshot(session, target, "round0").await;

            let items = match session.visible_items().await {
                Ok(items) => items,
                Err(e) => break 'collect Termination::read_failed(e),
            };
            frontier = items.len();
            let added = self.absorb(&mut collection, adapter, &items, 0, title);
            info!(
                "[{}] {} - initial cards: {}, collected: {}",
                target.site, title, frontier, added
            );

            loop {
                if collection.len() >= self.config.max_items {
                    break 'collect Termination::MaxItems;
                }
                if rounds >= self.config.max_rounds {
                    break 'collect Termination::MaxRounds;
                }

                match session.reveal_more().await {
                    Ok(RevealOutcome::Triggered) => {
                        rounds += 1;
                        debug!("[{}] {} - reveal #{}", target.site, title, rounds);
                    }
                    Ok(RevealOutcome::Unavailable) => break 'collect Termination::RevealUnavailable,
                    Err(e) => break 'collect Termination::reveal_failed(e),
                }

                let grown = match wait_for_count(session, frontier, &self.config.wait).await {
                    Ok(grown) => grown,
                    Err(e) => break 'collect Termination::read_failed(e),
                };
                if grown.is_none() {
                    info!(
                        "[{}] {} - no new cards after reveal #{}, stopping",
                        target.site, title, rounds
                    );
                    self.dumper
                        .snapshot(session, target, &format!("round{}_stalled", rounds))
                        .await;
                    break 'collect Termination::Stagnated;
                }

                let items = match session.visible_items().await {
                    Ok(items) => items,
                    Err(e) => break 'collect Termination::read_failed(e),
                };
                let start = frontier.min(items.len());
                let added = self.absorb(&mut collection, adapter, &items[start..], rounds, title);
                frontier = items.len();
                debug!(
                    "[{}] {} - cards: {}, new reviews: {}",
                    target.site, title, frontier, added
                );
            }
        };

        if frontier > 0 && !termination.is_fatal() {
            self.dumper
                .snapshot(session, target, &format!("round{}_last", rounds))
                .await;
        }
        info!(
            "[{}] {} - finished with {} reviews after {} rounds ({})",
            target.site,
            title,
            collection.len(),
            rounds,
            termination
        );

        CollectionReport {
            target: target.clone(),
            reviews: collection.into_reviews(),
            termination,
            rounds,
            visible: frontier,
        }
    }

    /// Parses a freshly revealed slice. Returns the number of reviews added.
    fn absorb(
        &self,
        collection: &mut Collection,
        adapter: &dyn SiteAdapter,
        slice: &[ItemElement],
        round: usize,
        title: &str,
    ) -> usize {
        let mut added = 0;
        for (position, element) in slice.iter().enumerate() {
            let key = adapter
                .stable_key(element)
                .map(ItemKey::Reference)
                .unwrap_or(ItemKey::Position { round, position });
            if collection.contains(&key) {
                debug!("{} - duplicate item {}", title, key);
                continue;
            }

            let parsed = adapter.parse_item(element);
            if parsed.body.trim().is_empty() {
                debug!("{} - discarding item {} with empty body", title, key);
                continue;
            }

            if collection.insert(Review::new(key, round, parsed)) {
                added += 1;
                if collection.len() % PROGRESS_EVERY == 0 {
                    info!("{} - {} reviews so far", title, collection.len());
                }
            }
        }
        added
    }
}
