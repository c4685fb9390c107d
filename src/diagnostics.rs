use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Session, Target};

/// Writes raw page snapshots for offline inspection. Advisory only: every
/// failure is logged and swallowed.
#[derive(Debug, Clone, Default)]
pub struct DebugDumper {
    dir: Option<PathBuf>,
}

impl DebugDumper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// A dumper that never writes anything.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// `<dir>/<site>_<target key>_<label>.html`
    pub fn snapshot_path(&self, target: &Target, label: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| {
            dir.join(format!(
                "{}_{}_{}.html",
                target.site.slug(),
                target.key(),
                label
            ))
        })
    }

    pub async fn snapshot<S>(&self, session: &mut S, target: &Target, label: &str)
    where
        S: Session + ?Sized,
    {
        let Some(path) = self.snapshot_path(target, label) else {
            return;
        };

        let html = match session.page_source().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not read page source for snapshot {:?}: {}", path, e);
                return;
            }
        };

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            warn!("Could not create debug directory {:?}: {}", parent, e);
            return;
        }

        match tokio::fs::write(&path, html).await {
            Ok(()) => debug!("Saved snapshot -> {:?}", path),
            Err(e) => warn!("Could not save snapshot {:?}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemElement, RevealOutcome, SessionError, Site};

    struct Static(&'static str);

    #[async_trait::async_trait]
    impl Session for Static {
        async fn navigate(&mut self, _target: &Target) -> Result<(), SessionError> {
            Ok(())
        }
        async fn visible_items(&mut self) -> Result<Vec<ItemElement>, SessionError> {
            Ok(Vec::new())
        }
        async fn reveal_more(&mut self) -> Result<RevealOutcome, SessionError> {
            Ok(RevealOutcome::Unavailable)
        }
        async fn page_source(&mut self) -> Result<String, SessionError> {
            Ok(self.0.to_string())
        }
    }

    fn target() -> Target {
        Target {
            site: Site::RottenTomatoes,
            locator: "https://www.rottentomatoes.com/m/carter_2022/reviews".to_string(),
            title: "카터".to_string(),
            title_en: Some("Carter".to_string()),
            language: Some("en".to_string()),
            year: Some(2022),
        }
    }

    #[tokio::test]
    async fn test_snapshot_writes_keyed_file() {
        let dir = tempfile::tempdir().unwrap();
        let dumper = DebugDumper::new(dir.path().join("debug"));

        dumper
            .snapshot(&mut Static("<html>carter</html>"), &target(), "round0")
            .await;

        let path = dir.path().join("debug").join("rt_carter_round0.html");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html>carter</html>");
    }

    #[tokio::test]
    async fn test_disabled_dumper_writes_nothing() {
        let dumper = DebugDumper::disabled();
        assert!(dumper.snapshot_path(&target(), "last").is_none());
        dumper.snapshot(&mut Static("x"), &target(), "last").await;
    }
}
