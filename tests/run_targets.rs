use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use review_scrape::config::RunConfig;
use review_scrape::runner::Runner;
use review_scrape::{
    ItemElement, RevealOutcome, Session, SessionError, Site, SiteAdapter, Target, Termination,
};

enum Script {
    Pages(Vec<Vec<String>>),
    Fail(fn() -> SessionError),
}

/// Serves canned IMDb cards per locator and records every navigation.
struct CannedSession {
    scripts: Arc<HashMap<String, Script>>,
    visited: Arc<Mutex<Vec<String>>>,
    pending: Vec<Vec<String>>,
    visible: Vec<ItemElement>,
}

#[async_trait::async_trait]
impl Session for CannedSession {
    async fn navigate(&mut self, target: &Target) -> Result<(), SessionError> {
        self.visited.lock().unwrap().push(target.locator.clone());
        self.visible.clear();
        match self.scripts.get(&target.locator) {
            Some(Script::Pages(pages)) => {
                self.pending = pages.iter().rev().cloned().collect();
                if let Some(first) = self.pending.pop() {
                    self.visible = first.into_iter().map(ItemElement::new).collect();
                }
                Ok(())
            }
            Some(Script::Fail(make)) => Err(make()),
            None => Ok(()),
        }
    }

    async fn visible_items(&mut self) -> Result<Vec<ItemElement>, SessionError> {
        Ok(self.visible.clone())
    }

    async fn reveal_more(&mut self) -> Result<RevealOutcome, SessionError> {
        match self.pending.pop() {
            Some(page) => {
                self.visible.extend(page.into_iter().map(ItemElement::new));
                Ok(RevealOutcome::Triggered)
            }
            None => Ok(RevealOutcome::Unavailable),
        }
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(String::new())
    }
}

fn card(id: u32, rating: u32, body: &str) -> String {
    format!(
        r#"<div data-testid="review-card-parent">
             <span class="ipc-rating-star--rating">{rating}</span>
             <a href="/review/rw{id}/">Permalink</a>
             <div data-testid="review-overflow">
               <div class="ipc-html-content-inner-div">{body}</div>
             </div>
             <ul><li class="review-date">Oct 1, 2021</li></ul>
           </div>"#
    )
}

fn target(locator: &str, title: &str) -> Target {
    Target {
        site: Site::Imdb,
        locator: locator.to_string(),
        title: title.to_string(),
        title_en: None,
        language: None,
        year: Some(2021),
    }
}

fn config(dir: &std::path::Path, targets: Vec<Target>) -> RunConfig {
    let mut config = RunConfig {
        targets,
        ..Default::default()
    };
    config.collector.wait_timeout_secs = 1;
    config.collector.poll_interval_ms = 10;
    config.output.path = dir.join("reviews.csv");
    config.output.summary_path = Some(dir.join("summary.json"));
    config.output.bom = false;
    config
}

fn runner_sessions(
    scripts: HashMap<String, Script>,
) -> (
    Arc<Mutex<Vec<String>>>,
    impl FnMut(Arc<dyn SiteAdapter>) -> CannedSession,
) {
    let scripts = Arc::new(scripts);
    let visited = Arc::new(Mutex::new(Vec::new()));
    let log = visited.clone();
    let open = move |_adapter: Arc<dyn SiteAdapter>| CannedSession {
        scripts: scripts.clone(),
        visited: log.clone(),
        pending: Vec::new(),
        visible: Vec::new(),
    };
    (visited, open)
}

#[tokio::test]
async fn test_failed_navigation_does_not_stop_later_targets() {
    let dir = tempfile::tempdir().unwrap();
    let targets = vec![
        target("tt0000001", "첫 번째"),
        target("tt0000002", "두 번째"),
    ];
    let mut scripts = HashMap::new();
    scripts.insert(
        "tt0000001".to_string(),
        Script::Fail(|| SessionError::Transient("HTTP 503".to_string())),
    );
    scripts.insert(
        "tt0000002".to_string(),
        Script::Pages(vec![
            vec![card(1, 8, "Sharp and funny."), card(2, 5, "Drags in the middle.")],
            vec![card(2, 5, "Drags in the middle."), card(3, 10, "Loved it.")],
        ]),
    );
    let (visited, open) = runner_sessions(scripts);

    let config = config(dir.path(), targets.clone());
    let mut runner = Runner::from_config(&config).unwrap();
    let summary = runner.run_with(&targets, open).await.unwrap();

    assert_eq!(visited.lock().unwrap().len(), 2);
    assert!(!summary.aborted);
    assert_eq!(summary.total, 3);
    assert_eq!(
        summary.targets[0].termination,
        Termination::NavigationFailed("HTTP 503".to_string())
    );
    assert_eq!(summary.targets[1].collected, 3);
    assert_eq!(summary.targets[1].rounds, 1);
    assert_eq!(summary.targets[1].termination, Termination::RevealUnavailable);

    let csv = fs::read_to_string(dir.path().join("reviews.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "site,title,title_en,year,rating,date,review");
    assert!(lines[3].ends_with("Loved it."));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(json["total"], 3);
    assert_eq!(json["targets"][0]["termination"]["reason"], "navigation_failed");
    assert_eq!(json["targets"][1]["termination"]["reason"], "reveal_unavailable");
}

#[tokio::test]
async fn test_closed_session_aborts_remaining_targets() {
    let dir = tempfile::tempdir().unwrap();
    let targets = vec![
        target("tt0000001", "첫 번째"),
        target("tt0000002", "두 번째"),
    ];
    let mut scripts = HashMap::new();
    scripts.insert(
        "tt0000001".to_string(),
        Script::Fail(|| SessionError::Closed("browser gone".to_string())),
    );
    scripts.insert(
        "tt0000002".to_string(),
        Script::Pages(vec![vec![card(1, 7, "Never reached.")]]),
    );
    let (visited, open) = runner_sessions(scripts);

    let config = config(dir.path(), targets.clone());
    let mut runner = Runner::from_config(&config).unwrap();
    let summary = runner.run_with(&targets, open).await.unwrap();

    assert_eq!(*visited.lock().unwrap(), vec!["tt0000001".to_string()]);
    assert!(summary.aborted);
    assert_eq!(summary.targets.len(), 1);
    assert_eq!(
        summary.targets[0].termination,
        Termination::SessionClosed("browser gone".to_string())
    );
    assert_eq!(summary.total, 0);
    assert!(!dir.path().join("reviews.csv").exists());
}
