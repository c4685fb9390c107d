//! CSV persistence for collected reviews, one row per review.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{Review, SinkError, Target};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const SITE_COLUMN: &str = "site";
const COLUMNS: [&str; 6] = ["title", "title_en", "year", "rating", "date", "review"];

pub struct CsvSink {
    path: PathBuf,
    /// Keep rows already in the file from earlier runs.
    append: bool,
    bom: bool,
    include_site: bool,
    /// Set after the first write of this run; later writes always append.
    started: bool,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: true,
            bom: true,
            include_site: true,
            started: false,
        }
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    pub fn with_site_column(mut self, include_site: bool) -> Self {
        self.include_site = include_site;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(COLUMNS.len() + 1);
        if self.include_site {
            columns.push(SITE_COLUMN);
        }
        columns.extend(COLUMNS);
        columns
    }

    /// Writes one row per review. Returns the number of rows written.
    pub fn write(&mut self, target: &Target, reviews: &[Review]) -> Result<usize, SinkError> {
        if reviews.is_empty() {
            warn!("No reviews to save for {}", target.display_title());
            return Ok(0);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| SinkError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let keep_existing = self.append || self.started;
        let has_rows = keep_existing
            && fs::metadata(&self.path)
                .map(|m| m.len() > 0)
                .unwrap_or(false);

        let mut file = if keep_existing {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?
        } else {
            File::create(&self.path)?
        };
        if !has_rows && self.bom {
            file.write_all(UTF8_BOM)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !has_rows {
            writer.write_record(self.columns())?;
        }
        for review in reviews {
            writer.write_record(self.record(target, review))?;
        }
        writer.flush()?;
        self.started = true;

        info!("Saved {} rows -> {:?}", reviews.len(), self.path);
        Ok(reviews.len())
    }

    fn record(&self, target: &Target, review: &Review) -> Vec<String> {
        let mut record = Vec::with_capacity(COLUMNS.len() + 1);
        if self.include_site {
            record.push(target.site.label().to_string());
        }
        record.push(target.title.clone());
        record.push(target.title_en.clone().unwrap_or_default());
        record.push(target.year.map(|y| y.to_string()).unwrap_or_default());
        record.push(review.score.map(|s| s.to_string()).unwrap_or_default());
        record.push(review.date.clone().unwrap_or_default());
        record.push(review.body.clone());
        record
    }
}
