use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishingStatus {
    Ongoing,
    Completed,
    OnHiatus,
    Cancelled,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    AlwaysUpdate,
    OnlyFetchOnce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRecord {
    /// Relative to the homepage.
    pub url: String,
    pub title: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub status: PublishingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub description: String,
    pub update_strategy: UpdateStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterEntry {
    /// Relative to the homepage.
    pub url: String,
    pub name: String,
    /// Milliseconds since the Unix epoch, 0 when unknown.
    pub date_upload: i64,
    pub scanlator: String,
    pub chapter_number: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub index: usize,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHitRecord {
    pub book_id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<usize>,
}
