use history_core::{AppConfig, Category, CoreError, SortOrder};
use history_store::MarkdownArchive;
use reddit_client::{ListingSource, ListingWalker, PaginationLimits};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: Category,
    pub path: PathBuf,
    pub pages: u32,
    pub records: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub categories: Vec<CategorySummary>,
}

impl ArchiveSummary {
    pub fn total_records(&self) -> usize {
        self.categories.iter().map(|c| c.records).sum()
    }

    pub fn total_pages(&self) -> u32 {
        self.categories.iter().map(|c| c.pages).sum()
    }

    pub fn any_truncated(&self) -> bool {
        self.categories.iter().any(|c| c.truncated)
    }

    pub fn log(&self) {
        for c in &self.categories {
            info!(
                "{}: {} records over {} pages -> {}{}",
                c.category,
                c.records,
                c.pages,
                c.path.display(),
                if c.truncated { " (truncated)" } else { "" }
            );
        }
        info!(
            "Archived {} records in {} requests",
            self.total_records(),
            self.total_pages()
        );
    }
}

/// Archives every activity category of one user, one category at a time.
pub struct ArchiveService<S: ListingSource> {
    source: S,
    store: MarkdownArchive,
    user: String,
    sort: SortOrder,
    limits: PaginationLimits,
}

impl<S: ListingSource> ArchiveService<S> {
    pub fn new(
        source: S,
        store: MarkdownArchive,
        user: impl Into<String>,
        sort: SortOrder,
        limits: PaginationLimits,
    ) -> Self {
        Self {
            source,
            store,
            user: user.into(),
            sort,
            limits,
        }
    }

    pub fn from_config(source: S, config: &AppConfig) -> Self {
        let limits = PaginationLimits {
            page_size: config.page_size,
            max_pages: Some(config.max_pages),
            deadline: config.max_duration,
        };
        Self::new(
            source,
            MarkdownArchive::new(config.output_dir.clone()),
            config.user.clone(),
            config.sort,
            limits,
        )
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn run(&self) -> Result<ArchiveSummary, CoreError> {
        self.run_categories(&Category::ALL).await
    }

    pub async fn run_categories(
        &self,
        categories: &[Category],
    ) -> Result<ArchiveSummary, CoreError> {
        self.store.prepare().await?;

        let mut summary = ArchiveSummary::default();
        for category in categories {
            summary
                .categories
                .push(self.archive_category(*category).await?);
        }
        Ok(summary)
    }

    /// Walks one listing to the end, appending each page as it arrives.
    pub async fn archive_category(
        &self,
        category: Category,
    ) -> Result<CategorySummary, CoreError> {
        let path = self.store.file_path(&self.user, category, self.sort);
        info!("file: {}", path.display());

        let mut walker = ListingWalker::new(
            &self.source,
            self.user.as_str(),
            category,
            self.sort,
            self.limits.clone(),
        );

        let mut records = 0;
        while let Some(page) = walker.next_page().await? {
            self.store.append(&path, &page.records).await?;
            records += page.records.len();
        }

        if walker.is_truncated() {
            warn!(
                "{} listing for u/{} was cut short; older items were not archived",
                category, self.user
            );
        }

        Ok(CategorySummary {
            category,
            path,
            pages: walker.pages_fetched(),
            records,
            truncated: walker.is_truncated(),
        })
    }
}
