#[cfg(test)]
mod tests {
    use crate::{render_markdown, render_record, MarkdownArchive};
    use history_core::{Category, CoreError, Record, SortOrder, StorageError};
    use std::env;
    use std::path::PathBuf;

    fn test_dir() -> PathBuf {
        env::temp_dir().join(format!("test_reddit_history_{}", uuid::Uuid::new_v4()))
    }

    fn record(title: &str, body: &str) -> Record {
        Record {
            subreddit: "rust".to_string(),
            link_title: title.to_string(),
            link_url: "https://reddit.com/r/rust/abc".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_record_markdown_layout() {
        let rendered = render_record(&record("T", "hello"));
        assert_eq!(
            rendered,
            "subreddit: [rust](https://reddit.com/r/rust)\n\n\
             [T](https://reddit.com/r/rust/abc)\n\n\
             hello\n\n---\n\n"
        );
    }

    #[test]
    fn test_renders_concatenate_in_order() {
        let first = render_record(&record("first", "a"));
        let second = render_record(&record("second", "b"));
        let joined = format!("{}{}", first, second);

        let blocks: Vec<&str> = joined.split("\n\n---\n\n").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("[first]"));
        assert!(blocks[1].contains("[second]"));

        assert_eq!(
            render_markdown(&[record("first", "a"), record("second", "b")]),
            joined
        );
    }

    #[test]
    fn test_empty_batch_renders_nothing() {
        assert_eq!(render_markdown(&[]), "");
    }

    #[test]
    fn test_file_naming() {
        let archive = MarkdownArchive::new("reddit_history");
        assert_eq!(
            archive.file_path("someone", Category::Submitted, SortOrder::New),
            PathBuf::from("reddit_history/reddit_someone_submitted_new.md")
        );
    }

    #[tokio::test]
    async fn test_append_creates_directories_and_appends() {
        let dir = test_dir();
        let archive = MarkdownArchive::new(dir.join("nested"));
        let path = archive.file_path("me", Category::Saved, SortOrder::Top);

        archive.append(&path, &[record("one", "1")]).await.unwrap();
        archive.append(&path, &[record("two", "2")]).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            render_markdown(&[record("one", "1"), record("two", "2")])
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_rerun_duplicates_content() {
        let dir = test_dir();
        let archive = MarkdownArchive::new(&dir);
        let path = archive.file_path("me", Category::Comments, SortOrder::Top);
        let batch = vec![record("same", "again")];

        archive.append(&path, &batch).await.unwrap();
        archive.append(&path, &batch).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("[same]").count(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_still_creates_file() {
        let dir = test_dir();
        let archive = MarkdownArchive::new(&dir);
        let path = archive.file_path("me", Category::Overview, SortOrder::Top);

        archive.append(&path, &[]).await.unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_leaves_existing_file_untouched() {
        let dir = test_dir();
        let archive = MarkdownArchive::new(&dir);
        let path = archive.file_path("me", Category::Saved, SortOrder::Top);

        archive.append(&path, &[record("kept", "body")]).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        archive.append(&path, &[]).await.unwrap();
        archive.append(&path, &[]).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(before, render_record(&record("kept", "body")).into_bytes());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = test_dir();
        let archive = MarkdownArchive::new(&dir);
        archive.prepare().await.unwrap();

        // A directory where the file should be makes the open fail.
        let path = archive.file_path("me", Category::Saved, SortOrder::Top);
        std::fs::create_dir_all(&path).unwrap();

        let result = archive.append(&path, &[record("x", "y")]).await;
        match result {
            Err(CoreError::Storage(StorageError::WriteFailed { path: reported, .. })) => {
                assert!(reported.ends_with("reddit_me_saved_top.md"));
            }
            other => panic!("Expected WriteFailed, got {:?}", other),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_blocked_directory_is_reported() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let archive = MarkdownArchive::new(blocker.join("out"));
        let path = archive.file_path("me", Category::Saved, SortOrder::Top);
        let result = archive.append(&path, &[record("x", "y")]).await;
        assert!(matches!(
            result,
            Err(CoreError::Storage(StorageError::CreateDirectoryFailed { .. }))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
