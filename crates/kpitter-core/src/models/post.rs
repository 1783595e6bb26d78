use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: UserProfile,
    #[serde(rename = "likes", alias = "likeCount", default)]
    pub like_count: u32,
    #[serde(rename = "is_liked", alias = "likedByCurrentUser", default)]
    pub liked_by_current_user: bool,
    #[serde(rename = "created_at", alias = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn likes_display(&self) -> String {
        match self.like_count {
            1 => "1 like".to_string(),
            n => format!("{} likes", n),
        }
    }
}

/// Body of a create-post request
#[derive(Debug, Clone, Serialize)]
pub struct NewPost<'a> {
    pub content: &'a str,
}
