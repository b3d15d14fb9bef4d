use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Activity listing exposed under `/user/{name}/{category}.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Saved,
    Comments,
    Submitted,
    Overview,
}

impl Category {
    /// Every category, in the order a run archives them.
    pub const ALL: [Category; 4] = [
        Category::Saved,
        Category::Comments,
        Category::Submitted,
        Category::Overview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Saved => "saved",
            Category::Comments => "comments",
            Category::Submitted => "submitted",
            Category::Overview => "overview",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "category".to_string(),
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Hot,
    New,
    #[default]
    Top,
    Controversial,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Hot => "hot",
            SortOrder::New => "new",
            SortOrder::Top => "top",
            SortOrder::Controversial => "controversial",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(SortOrder::Hot),
            "new" => Ok(SortOrder::New),
            "top" => Ok(SortOrder::Top),
            "controversial" => Ok(SortOrder::Controversial),
            _ => Err(ConfigError::InvalidValue {
                field: "sort".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// One archived item, flattened from either a comment or a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub subreddit: String,
    pub link_title: String,
    pub link_url: String,
    pub body: String,
}
