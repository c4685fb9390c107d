//! Sequential multi-target runs: one target is navigated, collected and
//! persisted before the next one starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::diagnostics::DebugDumper;
use crate::http_session::{HttpSession, HttpSettings, build_client};
use crate::sink::CsvSink;
use crate::{
    CollectionReport, IncrementalCollector, RunError, Session, Site, SiteAdapter, Target,
    Termination,
};

/// What happened to one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub site: Site,
    pub title: String,
    pub locator: String,
    pub collected: usize,
    pub written: usize,
    pub rounds: usize,
    pub termination: Termination,
}

impl TargetOutcome {
    fn new(report: &CollectionReport, written: usize) -> Self {
        Self {
            site: report.target.site,
            title: report.target.title.clone(),
            locator: report.target.locator.clone(),
            collected: report.reviews.len(),
            written,
            rounds: report.rounds,
            termination: report.termination.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    /// Set when a lost session stopped the run early.
    pub aborted: bool,
    pub targets: Vec<TargetOutcome>,
}

impl RunSummary {
    pub fn write_to(&self, path: &Path) -> Result<(), RunError> {
        let summary_error = |reason: String| RunError::Summary {
            path: path.to_path_buf(),
            reason,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| summary_error(e.to_string()))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| summary_error(e.to_string()))?;
        }
        std::fs::write(path, json).map_err(|e| summary_error(e.to_string()))
    }
}

pub struct Runner {
    client: Client,
    http: HttpSettings,
    collector: IncrementalCollector,
    sink: CsvSink,
    summary_path: Option<PathBuf>,
}

impl Runner {
    pub fn from_config(config: &RunConfig) -> Result<Self, RunError> {
        let http = config.session.to_http_settings();
        let client = build_client(&http)?;

        let dumper = config
            .output
            .debug_dir
            .as_ref()
            .map(DebugDumper::new)
            .unwrap_or_else(DebugDumper::disabled);
        let collector = IncrementalCollector::new(config.collector.to_collector_config())
            .with_diagnostics(dumper);

        let sink = CsvSink::new(&config.output.path)
            .with_append(config.output.append)
            .with_bom(config.output.bom)
            .with_site_column(config.output.include_site);

        Ok(Self {
            client,
            http,
            collector,
            sink,
            summary_path: config.output.summary_path.clone(),
        })
    }

    /// Runs every target over HTTP sessions.
    pub async fn run(&mut self, targets: &[Target]) -> Result<RunSummary, RunError> {
        let client = self.client.clone();
        let http = self.http.clone();
        self.run_with(targets, move |adapter| {
            HttpSession::new(client.clone(), adapter, http.clone())
        })
        .await
    }

    /// Runs every target with sessions produced by `open_session`, one per
    /// target.
    pub async fn run_with<S, F>(
        &mut self,
        targets: &[Target],
        mut open_session: F,
    ) -> Result<RunSummary, RunError>
    where
        S: Session,
        F: FnMut(Arc<dyn SiteAdapter>) -> S,
    {
        let started_at = Utc::now();
        let mut adapters: HashMap<Site, Arc<dyn SiteAdapter>> = HashMap::new();
        let mut outcomes = Vec::with_capacity(targets.len());
        let mut aborted = false;

        for (i, target) in targets.iter().enumerate() {
            info!(
                "[{}/{}] {} / {} ({}) [{}]",
                i + 1,
                targets.len(),
                target.title,
                target.title_en.as_deref().unwrap_or("-"),
                target.year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string()),
                target.locator
            );

            let adapter = match adapters.get(&target.site) {
                Some(adapter) => adapter.clone(),
                None => {
                    let adapter = target.site.adapter()?;
                    adapters.insert(target.site, adapter.clone());
                    adapter
                }
            };

            let mut session = open_session(adapter.clone());
            let report = self
                .collect_target(&mut session, adapter.as_ref(), target)
                .await;
            let written = self.sink.write(target, &report.reviews)?;
            info!("  -> {} reviews ({})", report.reviews.len(), report.termination);
            outcomes.push(TargetOutcome::new(&report, written));

            if report.termination.is_fatal() {
                warn!(
                    "Session lost while collecting {}; skipping {} remaining targets",
                    target.display_title(),
                    targets.len() - i - 1
                );
                aborted = true;
                break;
            }
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            total: outcomes.iter().map(|o| o.written).sum(),
            aborted,
            targets: outcomes,
        };
        info!(
            "Collected {} reviews across {} targets",
            summary.total,
            summary.targets.len()
        );

        if let Some(path) = &self.summary_path {
            summary.write_to(path)?;
            info!("Run summary -> {:?}", path);
        }
        Ok(summary)
    }

    async fn collect_target<S>(
        &self,
        session: &mut S,
        adapter: &dyn SiteAdapter,
        target: &Target,
    ) -> CollectionReport
    where
        S: Session + ?Sized,
    {
        if let Err(e) = session.navigate(target).await {
            warn!("Could not open {}: {}", target.display_title(), e);
            return CollectionReport::navigation_failed(target, &e);
        }
        self.collector.collect(session, adapter, target).await
    }
}
