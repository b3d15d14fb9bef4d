use history_core::{Category, CoreError, Record, SortOrder, StorageError};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[cfg(test)]
mod tests;

const REDDIT_WEB_BASE: &str = "https://reddit.com";

/// Renders one record as a markdown block ending in a horizontal rule.
pub fn render_record(record: &Record) -> String {
    format!(
        "subreddit: [{sub}]({base}/r/{sub})\n\n[{title}]({link})\n\n{body}\n\n---\n\n",
        sub = record.subreddit,
        base = REDDIT_WEB_BASE,
        title = record.link_title,
        link = record.link_url,
        body = record.body,
    )
}

pub fn render_markdown(records: &[Record]) -> String {
    records.iter().map(render_record).collect()
}

/// Append-only markdown files, one per user, category and sort order.
#[derive(Debug, Clone)]
pub struct MarkdownArchive {
    output_dir: PathBuf,
}

impl MarkdownArchive {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_path(&self, user: &str, category: Category, sort: SortOrder) -> PathBuf {
        self.output_dir
            .join(format!("reddit_{}_{}_{}.md", user, category, sort))
    }

    /// Appends the rendered records, creating the file and its directory
    /// first if needed. An empty batch only creates the file. The file is
    /// closed again before returning.
    pub async fn append(&self, path: &Path, records: &[Record]) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::CreateDirectoryFailed {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let write_failed = |source: std::io::Error| StorageError::WriteFailed {
            path: path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(write_failed)?;

        if records.is_empty() {
            debug!("Empty page, nothing appended to {}", path.display());
            return Ok(());
        }

        let markdown = render_markdown(records);
        file.write_all(markdown.as_bytes())
            .await
            .map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;

        debug!(
            "Appended {} records ({} bytes) to {}",
            records.len(),
            markdown.len(),
            path.display()
        );
        Ok(())
    }

    /// Makes sure the output directory exists before a run starts.
    pub async fn prepare(&self) -> Result<(), CoreError> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| StorageError::CreateDirectoryFailed {
                path: self.output_dir.display().to_string(),
                source,
            })?;
        info!("Writing archive files under {}", self.output_dir.display());
        Ok(())
    }
}
