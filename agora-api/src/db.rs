use std::collections::HashSet;

use async_trait::async_trait;

use crate::{CommentId, CommentRow, NewComment, PostId, StoreError, ViewerId};

/// Access to the persistent comment store
///
/// Implementations must answer `fetch_replies` and `fetch_liked_comment_ids`
/// without issuing a query when there is nothing to look up.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Top-level comments of the post, newest first
    async fn fetch_top_level_comments(&self, post: &PostId)
        -> Result<Vec<CommentRow>, StoreError>;

    /// Replies to any of `parents`, oldest first
    async fn fetch_replies(
        &self,
        post: &PostId,
        parents: &HashSet<CommentId>,
    ) -> Result<Vec<CommentRow>, StoreError>;

    /// The subset of `comments` liked by `viewer`, empty for an absent viewer
    async fn fetch_liked_comment_ids(
        &self,
        viewer: Option<&ViewerId>,
        comments: &HashSet<CommentId>,
    ) -> Result<HashSet<CommentId>, StoreError>;

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentId, StoreError>;

    /// Idempotent: liking twice counts once
    async fn set_like(
        &self,
        viewer: &ViewerId,
        comment: &CommentId,
        liked: bool,
    ) -> Result<(), StoreError>;
}
