use crate::api::{CommentId, PostId, Time, UserId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Author {
    /// None for guests
    pub id: Option<UserId>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author: Author,
    pub content: String,
    pub created_at: Time,
    pub updated_at: Option<Time>,
    pub like_count: u32,

    /// Computed for the viewer the tree was assembled for
    pub liked_by_current_viewer: bool,

    /// Replies in chronological order. Always empty on a reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn find_in<'a>(comments: &'a [Comment], id: &CommentId) -> Option<&'a Comment> {
        for c in comments {
            if c.id == *id {
                return Some(c);
            }
            if let Some(res) = Comment::find_in(&c.replies, id) {
                return Some(res);
            }
        }
        None
    }
}

/// Number of comments in the tree, replies included
pub fn comment_count(comments: &[Comment]) -> usize {
    comments.iter().map(|c| 1 + c.replies.len()).sum()
}
