use crate::CommentId;

/// Rejection of user-submitted input, raised before anything reaches the store
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Comment content is empty")]
    EmptyContent,

    #[error("Comment content is {len} characters long, the maximum is {max}")]
    ContentTooLong { len: usize, max: usize },

    #[error("Guest nickname is {len} characters long, the maximum is {max}")]
    NicknameTooLong { len: usize, max: usize },

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

/// Failure of a Gateway operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unknown parent comment {0}")]
    UnknownParent(CommentId),

    #[error("Comment {0} is itself a reply and cannot be replied to")]
    ReplyToReply(CommentId),

    #[error("Unknown comment {0}")]
    UnknownComment(CommentId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Short machine-readable tag, used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::PermissionDenied => "permission-denied",
            StoreError::Transport(_) => "transport",
            StoreError::Query(_) => "query",
            StoreError::UnknownParent(_) => "unknown-parent",
            StoreError::ReplyToReply(_) => "reply-to-reply",
            StoreError::UnknownComment(_) => "unknown-comment",
            StoreError::Other(_) => "other",
        }
    }
}
