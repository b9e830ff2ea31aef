//! Interface to the content host that receives a finished article.
//!
//! The pipeline stops at the reviewed markdown. Title extraction, markdown
//! to HTML conversion and the write call belong to the host application,
//! which implements [`Publisher`] for its CMS.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Visibility of a created post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    #[default]
    Draft,
    Pending,
}

/// A post ready to be written to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    /// Rendered HTML body.
    #[serde(rename = "content")]
    pub html_body: String,
    pub status: PostStatus,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            html_body: html_body.into(),
            status: PostStatus::default(),
        }
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }
}

/// What the host returned for a created post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    pub link: String,
    pub status: PostStatus,
}

/// A content host that accepts finished articles.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create the post.
    async fn publish(&self, post: PostDraft) -> Result<PublishedPost>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;
    use std::sync::Mutex;

    struct MemoryPublisher {
        posts: Mutex<Vec<PostDraft>>,
    }

    #[async_trait]
    impl Publisher for MemoryPublisher {
        async fn publish(&self, post: PostDraft) -> Result<PublishedPost> {
            if post.title.trim().is_empty() {
                return Err(anyhow::anyhow!("title is required").into());
            }
            let status = post.status;
            let mut posts = self.posts.lock().map_err(|e| PipelineError::Other(e.to_string()))?;
            posts.push(post);
            Ok(PublishedPost {
                id: posts.len() as u64,
                link: format!("https://blog.example/?p={}", posts.len()),
                status,
            })
        }
    }

    #[tokio::test]
    async fn test_publisher_round_trip() {
        let publisher = MemoryPublisher {
            posts: Mutex::new(Vec::new()),
        };
        let post = PostDraft::new("Home Office Setup", "<p>Hello</p>");
        assert_eq!(post.status, PostStatus::Draft);

        let published = publisher.publish(post).await.unwrap();
        assert_eq!(published.id, 1);
        assert_eq!(published.status, PostStatus::Draft);

        let err = publisher
            .publish(PostDraft::new(" ", "<p>x</p>").with_status(PostStatus::Publish))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Other(ref m) if m.contains("title")));
    }

    #[test]
    fn test_post_draft_wire_shape() {
        let post = PostDraft::new("T", "<p>b</p>").with_status(PostStatus::Pending);
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["content"], "<p>b</p>");
        assert_eq!(value["status"], "pending");
    }
}
