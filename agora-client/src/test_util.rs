use chrono::TimeZone;

use crate::api::{CommentId, CommentRow, PostId, Time};

pub fn at(secs: i64) -> Time {
    chrono::Utc
        .timestamp_opt(secs, 0)
        .single()
        .expect("timestamp out of range")
}

/// A guest-authored row of post "post" without nickname nor likes
pub fn row(id: &str, parent: Option<&str>, secs: i64) -> CommentRow {
    CommentRow {
        id: CommentId::from(id),
        post_id: PostId::from("post"),
        parent_id: parent.map(CommentId::from),
        user_id: None,
        guest_nickname: None,
        content: format!("content of {id}"),
        created_at: at(secs),
        updated_at: None,
        like_count: 0,
        profile: None,
        replies: Vec::new(),
    }
}
