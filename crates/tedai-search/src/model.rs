//! Domain Models

use serde::{Deserialize, Serialize};

/// One search result, in provider order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,

    /// Content snippet
    pub content: String,

    /// Provider relevance score, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            score: None,
        }
    }

    /// `title`, snippet and `URL:` line, as handed to the model
    pub fn to_context(&self) -> String {
        format!("{}\n{}\nURL: {}", self.title, self.content, self.url)
    }
}

/// Search depth offered by the provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl std::str::FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("Unknown search depth: {other}")),
        }
    }
}
