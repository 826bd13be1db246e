use serde::Deserialize;

use crate::{error::ApiError, posts::check_content};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_content(&self.content)
    }
}
