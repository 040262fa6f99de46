use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::{
    api::{CommentId, Gateway, NewComment, PostId, StoreError, ViewerId},
    assemble, Comment, Error, Presented, Presenter,
};

/// Marks the start of a fetch cycle; only the latest ticket of a post may commit
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchTicket {
    post: PostId,
    seq: u64,
}

impl FetchTicket {
    pub fn post(&self) -> &PostId {
        &self.post
    }
}

#[derive(Clone, Debug)]
pub enum Refresh {
    Presented(Presented),

    /// A more recently started cycle exists for the post, this result was discarded
    Superseded,
}

impl Refresh {
    pub fn presented(self) -> Option<Presented> {
        match self {
            Refresh::Presented(p) => Some(p),
            Refresh::Superseded => None,
        }
    }
}

/// Runs fetch-assemble-present cycles against a Gateway
///
/// Locks are only held for synchronous sections, so overlapping refreshes of
/// the same post are fine: whichever was started last wins, regardless of the
/// order in which they complete.
pub struct CommentFeed<G> {
    gateway: G,
    tickets: Mutex<Tickets>,
    presenter: Mutex<Presenter>,
}

// Sequence numbers are feed-wide and never reused, so that a ticket handed
// out before a `forget` cannot match one handed out after it
#[derive(Debug, Default)]
struct Tickets {
    next_seq: u64,
    latest: HashMap<PostId, u64>,
}

impl<G: Gateway> CommentFeed<G> {
    pub fn new(gateway: G) -> CommentFeed<G> {
        CommentFeed {
            gateway,
            tickets: Mutex::new(Tickets::default()),
            presenter: Mutex::new(Presenter::new()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn begin(&self, post: &PostId) -> FetchTicket {
        let mut tickets = self.tickets.lock();
        tickets.next_seq += 1;
        let seq = tickets.next_seq;
        tickets.latest.insert(post.clone(), seq);
        FetchTicket {
            post: post.clone(),
            seq,
        }
    }

    pub fn commit(&self, ticket: FetchTicket, tree: Vec<Comment>) -> Refresh {
        let tickets = self.tickets.lock();
        let latest = tickets.latest.get(&ticket.post).copied();
        if latest != Some(ticket.seq) {
            tracing::warn!(
                post = %ticket.post,
                seq = ticket.seq,
                ?latest,
                "discarding comments fetched by a superseded cycle"
            );
            return Refresh::Superseded;
        }
        let presented = self.presenter.lock().present(&ticket.post, tree);
        if presented.changed {
            tracing::info!(
                post = %ticket.post,
                comments = crate::comment_count(&presented.tree),
                "comment tree changed"
            );
        }
        Refresh::Presented(presented)
    }

    /// Fetches everything needed for the tree of `post`, all-or-nothing
    pub async fn fetch_tree(
        &self,
        post: &PostId,
        viewer: Option<&ViewerId>,
    ) -> Result<Vec<Comment>, StoreError> {
        let top_level = self.gateway.fetch_top_level_comments(post).await?;
        let parents = top_level
            .iter()
            .map(|c| c.id.clone())
            .collect::<HashSet<CommentId>>();
        let replies = self.gateway.fetch_replies(post, &parents).await?;
        let all_ids = top_level
            .iter()
            .chain(replies.iter())
            .map(|c| c.id.clone())
            .collect::<HashSet<CommentId>>();
        let liked = self
            .gateway
            .fetch_liked_comment_ids(viewer, &all_ids)
            .await?;
        Ok(assemble(post, top_level, replies, &liked))
    }

    pub async fn refresh(
        &self,
        post: &PostId,
        viewer: Option<&ViewerId>,
    ) -> Result<Refresh, Error> {
        let ticket = self.begin(post);
        match self.fetch_tree(post, viewer).await {
            Ok(tree) => Ok(self.commit(ticket, tree)),
            Err(err) => {
                tracing::error!(%post, kind = err.kind(), ?err, "failed fetching comments");
                Err(Error::Store(err))
            }
        }
    }

    /// Posts a comment then refreshes the tree of its post
    pub async fn post_comment(
        &self,
        comment: NewComment,
        viewer: Option<&ViewerId>,
    ) -> Result<(CommentId, Refresh), Error> {
        comment.validate()?;
        let post = comment.post_id.clone();
        let id = self.gateway.insert_comment(comment).await?;
        let refresh = self.refresh(&post, viewer).await?;
        Ok((id, refresh))
    }

    pub async fn set_like(
        &self,
        post: &PostId,
        viewer: &ViewerId,
        comment: &CommentId,
        liked: bool,
    ) -> Result<Refresh, Error> {
        self.gateway.set_like(viewer, comment, liked).await?;
        self.refresh(post, Some(viewer)).await
    }

    pub fn snapshot(&self, post: &PostId) -> Option<std::sync::Arc<[Comment]>> {
        self.presenter.lock().snapshot(post)
    }

    /// Forget everything about `post`; cycles still in flight for it will be discarded
    pub fn forget(&self, post: &PostId) {
        let mut tickets = self.tickets.lock();
        tickets.latest.remove(post);
        self.presenter.lock().forget(post);
    }
}
