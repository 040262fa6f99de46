use std::collections::{HashMap, HashSet};

use crate::{
    api::{CommentId, CommentRow, PostId},
    Author, Comment,
};

/// Display name of a guest comment posted without a nickname
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Display name of a guest reply posted without a nickname
pub const ANONYMOUS_REPLY_NAME: &str = "Reply";

const USER_ID_PREFIX_LEN: usize = 8;

fn resolve_author(row: &CommentRow, placeholder: &str) -> Author {
    if let Some(profile) = &row.profile {
        return Author {
            id: Some(profile.id.clone()),
            display_name: profile.username.clone(),
            avatar_url: profile.avatar_url.clone(),
        };
    }
    let nickname = row
        .guest_nickname
        .as_deref()
        .filter(|n| !n.trim().is_empty());
    let display_name = match (nickname, &row.user_id) {
        (Some(nickname), _) => String::from(nickname),
        (None, Some(user)) => format!(
            "User {}",
            user.as_str()
                .chars()
                .take(USER_ID_PREFIX_LEN)
                .collect::<String>()
        ),
        (None, None) => String::from(placeholder),
    };
    Author {
        id: row.user_id.clone(),
        display_name,
        avatar_url: None,
    }
}

fn build(row: CommentRow, placeholder: &str, liked: &HashSet<CommentId>) -> Comment {
    let author = resolve_author(&row, placeholder);
    Comment {
        liked_by_current_viewer: liked.contains(&row.id),
        id: row.id,
        post_id: row.post_id,
        parent_id: row.parent_id,
        author,
        content: row.content,
        created_at: row.created_at,
        updated_at: row.updated_at,
        like_count: row.like_count,
        // rows nested by the store are never trusted, replies come from reply rows only
        replies: Vec::new(),
    }
}

/// Builds the two-level comment tree of a post
///
/// `top_level` is expected newest-first and `replies` oldest-first, as the
/// Gateway returns them; neither is re-sorted. Replies whose parent is not in
/// `top_level` are dropped.
pub fn assemble(
    post: &PostId,
    top_level: Vec<CommentRow>,
    replies: Vec<CommentRow>,
    liked: &HashSet<CommentId>,
) -> Vec<Comment> {
    let parents = top_level
        .iter()
        .map(|r| r.id.clone())
        .collect::<HashSet<CommentId>>();

    let mut by_parent: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    for r in replies {
        match r.parent_id.clone().filter(|p| parents.contains(p)) {
            Some(p) => by_parent
                .entry(p)
                .or_default()
                .push(build(r, ANONYMOUS_REPLY_NAME, liked)),
            None => tracing::debug!(
                %post,
                reply = %r.id,
                parent = ?r.parent_id,
                "dropping reply whose parent is not a top-level comment of the post"
            ),
        }
    }

    top_level
        .into_iter()
        .map(|r| {
            let mut c = build(r, ANONYMOUS_NAME, liked);
            c.replies = by_parent
                .remove(&c.id)
                .unwrap_or_default()
                .into_iter()
                .map(|mut reply| {
                    reply.replies.clear();
                    reply
                })
                .collect();
            c
        })
        .collect()
}
