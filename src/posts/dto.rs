use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    store::{Comment, Post},
};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_CONTENT_LEN: usize = 1000;

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation("title is required and at most 100 characters"));
    }
    Ok(())
}

pub(crate) fn check_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() || content.chars().count() > MAX_CONTENT_LEN {
        return Err(ApiError::validation("content is required and at most 1000 characters"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_title(&self.title)?;
        check_content(&self.content)
    }
}

/// Partial update. `version` is the version the caller last read; when
/// omitted the version loaded for this request is used.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub version: Option<i32>,
}

impl UpdatePostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(content) = &self.content {
            check_content(content)?;
        }
        Ok(())
    }

    /// Applies the present fields to `post`.
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(version) = self.version {
            post.version = version;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}
