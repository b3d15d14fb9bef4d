use history_core::{Category, Record, SortOrder};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

const REDDIT_WEB_BASE: &str = "https://reddit.com";

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default, deserialize_with = "deserialize_cursor")]
    pub after: Option<String>,
    #[serde(default, deserialize_with = "deserialize_cursor")]
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingChild<T> {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: T,
}

/// Drops cursors that mean "no further page".
///
/// The listing endpoints have been seen to send the end-of-results cursor
/// both as JSON `null` and as the string `"null"`.
pub fn normalize_cursor(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| {
        let c = c.trim();
        !c.is_empty() && c != "null"
    })
}

fn deserialize_cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_cursor(raw))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentData {
    pub subreddit: String,
    pub link_title: String,
    pub link_id: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionData {
    pub subreddit: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub selftext: String,
}

/// A listing child, classified once when the page is decoded.
///
/// Anything carrying a `link_id` is a comment; everything else is treated as
/// a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityItem {
    Comment(CommentData),
    Submission(SubmissionData),
}

impl<'de> Deserialize<'de> for ActivityItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let is_comment = value.get("link_id").map_or(false, |v| !v.is_null());

        if is_comment {
            serde_json::from_value(value)
                .map(ActivityItem::Comment)
                .map_err(|e| de::Error::custom(format!("malformed comment: {}", e)))
        } else {
            serde_json::from_value(value)
                .map(ActivityItem::Submission)
                .map_err(|e| de::Error::custom(format!("malformed submission: {}", e)))
        }
    }
}

impl CommentData {
    /// Link to the thread the comment was left on.
    pub fn thread_url(&self) -> String {
        let id = self
            .link_id
            .split_once('_')
            .map(|(_, id)| id)
            .unwrap_or(&self.link_id);
        format!("{}/r/{}/{}", REDDIT_WEB_BASE, self.subreddit, id)
    }
}

impl From<ActivityItem> for Record {
    fn from(item: ActivityItem) -> Self {
        match item {
            ActivityItem::Comment(comment) => Self {
                link_url: comment.thread_url(),
                body: html_escape::decode_html_entities(&comment.body).into_owned(),
                subreddit: comment.subreddit,
                link_title: comment.link_title,
            },
            ActivityItem::Submission(submission) => Self {
                body: html_escape::decode_html_entities(&submission.selftext).into_owned(),
                subreddit: submission.subreddit,
                link_title: submission.title,
                link_url: submission.url,
            },
        }
    }
}

/// Flattens every child of a page into records, preserving order.
pub fn extract_records(listing: RedditListing<ActivityItem>) -> Vec<Record> {
    listing
        .data
        .children
        .into_iter()
        .map(|child| Record::from(child.data))
        .collect()
}

/// Parameters for one listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub user: String,
    pub category: Category,
    pub sort: SortOrder,
    pub limit: u32,
    pub after: Option<String>,
}
