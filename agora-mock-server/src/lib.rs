use std::{
    collections::{HashMap, HashSet, VecDeque},
    time::Duration,
};

use agora_api::{
    CommentId, CommentRow, Gateway, NewComment, PostId, ProfileRow, StoreError, Time, UserId,
    ViewerId,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

/// A comment as stored, without any join applied
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub guest_nickname: Option<String>,
    pub content: String,
    pub created_at: Time,
    #[serde(default)]
    pub updated_at: Option<Time>,
    #[serde(default)]
    pub like_count: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeRecord {
    pub viewer: ViewerId,
    pub comment: CommentId,
}

/// Serializable content of a MockServer
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Fixture {
    #[serde(default)]
    pub profiles: Vec<ProfileRow>,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
    #[serde(default)]
    pub likes: Vec<LikeRecord>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    FetchTopLevel,
    FetchReplies,
    FetchLiked,
    InsertComment,
    SetLike,
}

pub struct MockServer(Mutex<State>);

#[derive(Debug, Default)]
struct State {
    profiles: HashMap<UserId, ProfileRow>,
    // in insertion order
    comments: Vec<CommentRecord>,
    likes: HashSet<(ViewerId, CommentId)>,
    failures: HashMap<Operation, StoreError>,
    latencies: VecDeque<Duration>,
    queries: usize,
    last_insert: Option<Time>,
}

impl State {
    fn check(&mut self, op: Operation) -> Result<(), StoreError> {
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => {
                self.queries += 1;
                Ok(())
            }
        }
    }

    fn to_row(&self, c: &CommentRecord) -> CommentRow {
        CommentRow {
            id: c.id.clone(),
            post_id: c.post_id.clone(),
            parent_id: c.parent_id.clone(),
            user_id: c.user_id.clone(),
            guest_nickname: c.guest_nickname.clone(),
            content: c.content.clone(),
            created_at: c.created_at,
            updated_at: c.updated_at,
            like_count: c.like_count,
            profile: c
                .user_id
                .as_ref()
                .and_then(|u| self.profiles.get(u))
                .cloned(),
            replies: Vec::new(),
        }
    }

    fn comment_mut(&mut self, id: &CommentId) -> Option<&mut CommentRecord> {
        self.comments.iter_mut().find(|c| c.id == *id)
    }

    // Insertion timestamps are strictly increasing, so that ordering tests do
    // not depend on the clock resolution
    fn next_timestamp(&mut self) -> Time {
        let mut now = Utc::now();
        if let Some(last) = self.last_insert {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_insert = Some(now);
        now
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(State::default()))
    }

    pub fn from_fixture(f: Fixture) -> MockServer {
        let res = MockServer::new();
        {
            let mut s = res.0.lock();
            s.profiles = f.profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
            s.likes = f
                .likes
                .into_iter()
                .map(|l| (l.viewer, l.comment))
                .collect();
            s.last_insert = f.comments.iter().map(|c| c.created_at).max();
            s.comments = f.comments;
        }
        res
    }

    pub fn to_fixture(&self) -> Fixture {
        let s = self.0.lock();
        let mut profiles = s.profiles.values().cloned().collect::<Vec<_>>();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        let mut likes = s
            .likes
            .iter()
            .map(|(viewer, comment)| LikeRecord {
                viewer: viewer.clone(),
                comment: comment.clone(),
            })
            .collect::<Vec<_>>();
        likes.sort_by(|a, b| (&a.viewer, &a.comment).cmp(&(&b.viewer, &b.comment)));
        Fixture {
            profiles,
            comments: s.comments.clone(),
            likes,
        }
    }

    pub fn add_profile(&self, p: ProfileRow) {
        self.0.lock().profiles.insert(p.id.clone(), p);
    }

    pub fn remove_profile(&self, u: &UserId) {
        self.0.lock().profiles.remove(u);
    }

    /// Add a comment as-is, bypassing all checks
    pub fn add_comment(&self, c: CommentRecord) {
        self.0.lock().comments.push(c);
    }

    /// Make the next call to `op` fail with `err`
    pub fn fail_next(&self, op: Operation, err: StoreError) {
        self.0.lock().failures.insert(op, err);
    }

    /// Delay the next `fetch_top_level_comments` call by `d`
    pub fn push_latency(&self, d: Duration) {
        self.0.lock().latencies.push_back(d);
    }

    /// Number of queries that actually reached the store
    pub fn queries_issued(&self) -> usize {
        self.0.lock().queries
    }

    pub fn like_count(&self, c: &CommentId) -> Option<u32> {
        let s = self.0.lock();
        s.comments.iter().find(|r| r.id == *c).map(|r| r.like_count)
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl Gateway for MockServer {
    async fn fetch_top_level_comments(
        &self,
        post: &PostId,
    ) -> Result<Vec<CommentRow>, StoreError> {
        let latency = self.0.lock().latencies.pop_front();
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
        let mut s = self.0.lock();
        s.check(Operation::FetchTopLevel)?;
        let mut res = s
            .comments
            .iter()
            .filter(|c| c.post_id == *post && c.parent_id.is_none())
            .map(|c| s.to_row(c))
            .collect::<Vec<_>>();
        res.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(res)
    }

    async fn fetch_replies(
        &self,
        post: &PostId,
        parents: &HashSet<CommentId>,
    ) -> Result<Vec<CommentRow>, StoreError> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let mut s = self.0.lock();
        s.check(Operation::FetchReplies)?;
        let mut res = s
            .comments
            .iter()
            .filter(|c| {
                c.post_id == *post && c.parent_id.as_ref().map_or(false, |p| parents.contains(p))
            })
            .map(|c| s.to_row(c))
            .collect::<Vec<_>>();
        res.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(res)
    }

    async fn fetch_liked_comment_ids(
        &self,
        viewer: Option<&ViewerId>,
        comments: &HashSet<CommentId>,
    ) -> Result<HashSet<CommentId>, StoreError> {
        let viewer = match viewer {
            Some(v) if !comments.is_empty() => v,
            _ => return Ok(HashSet::new()),
        };
        let mut s = self.0.lock();
        s.check(Operation::FetchLiked)?;
        Ok(s.likes
            .iter()
            .filter(|(v, c)| v == viewer && comments.contains(c))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentId, StoreError> {
        let mut s = self.0.lock();
        s.check(Operation::InsertComment)?;
        if let Some(parent_id) = &comment.parent_id {
            let parent = s
                .comments
                .iter()
                .find(|c| c.id == *parent_id && c.post_id == comment.post_id)
                .ok_or_else(|| StoreError::UnknownParent(parent_id.clone()))?;
            if parent.parent_id.is_some() {
                return Err(StoreError::ReplyToReply(parent_id.clone()));
            }
        }
        let id = CommentId::new_random();
        let created_at = s.next_timestamp();
        s.comments.push(CommentRecord {
            id: id.clone(),
            user_id: comment.user_id().cloned(),
            guest_nickname: comment.guest_nickname().map(String::from),
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            content: comment.content,
            created_at,
            updated_at: None,
            like_count: 0,
        });
        tracing::debug!(comment = %id, "inserted comment");
        Ok(id)
    }

    async fn set_like(
        &self,
        viewer: &ViewerId,
        comment: &CommentId,
        liked: bool,
    ) -> Result<(), StoreError> {
        let mut s = self.0.lock();
        s.check(Operation::SetLike)?;
        if s.comment_mut(comment).is_none() {
            return Err(StoreError::UnknownComment(comment.clone()));
        }
        let key = (viewer.clone(), comment.clone());
        let changed = match liked {
            true => s.likes.insert(key),
            false => s.likes.remove(&key),
        };
        if changed {
            if let Some(c) = s.comment_mut(comment) {
                c.like_count = match liked {
                    true => c.like_count.saturating_add(1),
                    false => c.like_count.saturating_sub(1),
                };
            }
        }
        Ok(())
    }
}
