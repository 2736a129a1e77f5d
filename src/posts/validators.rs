use super::models::PostRequest;
use crate::common::{ValidationResult, Validator};

pub const MAX_CONTENT_CHARS: usize = 10_000;
pub const MAX_CAPTION_CHARS: usize = 255;

impl Validator<PostRequest> for PostRequest {
    fn validate(&self, data: &PostRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.content.trim().is_empty() {
            result.add_error("content", "Content is required");
        }

        if data.content.chars().count() > MAX_CONTENT_CHARS {
            result.add_error("content", "Content must not exceed 10000 characters");
        }

        if data.caption.chars().count() > MAX_CAPTION_CHARS {
            result.add_error("caption", "Caption must not exceed 255 characters");
        }

        result
    }
}
