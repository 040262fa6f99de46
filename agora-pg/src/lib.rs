use std::collections::HashSet;

use agora_api::{
    CommentId, CommentRow, Gateway, NewComment, PostId, ProfileRow, StoreError, UserId, ViewerId,
};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 8;

// postgres' insufficient_privilege
const PG_PERMISSION_DENIED: &str = "42501";

pub async fn create_sqlx_pool(db_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(db_url)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))
}

fn store_error(err: sqlx::Error, ctx: &'static str) -> StoreError {
    match err {
        sqlx::Error::Database(e) if e.code().as_deref() == Some(PG_PERMISSION_DENIED) => {
            tracing::info!(%e, "{ctx}: permission denied");
            StoreError::PermissionDenied
        }
        sqlx::Error::Database(e) => StoreError::Query(format!("{ctx}: {e}")),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Transport(format!("{ctx}: {err}")),
        err => StoreError::Other(anyhow::Error::new(err).context(ctx)),
    }
}

trait StoreContext<T> {
    fn store_context(self, ctx: &'static str) -> Result<T, StoreError>;
}

impl<T> StoreContext<T> for Result<T, sqlx::Error> {
    fn store_context(self, ctx: &'static str) -> Result<T, StoreError> {
        self.map_err(|e| store_error(e, ctx))
    }
}

fn comment_row(row: &PgRow) -> Result<CommentRow, sqlx::Error> {
    let profile = match row.try_get::<Option<String>, _>("profile_id")? {
        None => None,
        Some(id) => Some(ProfileRow {
            id: UserId(id),
            username: row.try_get("profile_username")?,
            avatar_url: row.try_get("profile_avatar_url")?,
        }),
    };
    // the column is CHECKed to be non-negative
    let like_count = u32::try_from(row.try_get::<i32, _>("like_count")?).unwrap_or(0);
    Ok(CommentRow {
        id: CommentId(row.try_get("id")?),
        post_id: PostId(row.try_get("post_id")?),
        parent_id: row.try_get::<Option<String>, _>("parent_id")?.map(CommentId),
        user_id: row.try_get::<Option<String>, _>("user_id")?.map(UserId),
        guest_nickname: row.try_get("guest_nickname")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        like_count,
        profile,
        replies: Vec::new(),
    })
}

fn id_list<'a>(ids: impl IntoIterator<Item = &'a CommentId>) -> Vec<String> {
    ids.into_iter().map(|id| id.0.clone()).collect()
}

pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> PgGateway {
        PgGateway { pool }
    }

    pub async fn connect(db_url: &str) -> anyhow::Result<PgGateway> {
        let pool = create_sqlx_pool(db_url).await?;
        MIGRATOR
            .run(&pool)
            .await
            .context("applying database migrations")?;
        Ok(PgGateway::new(pool))
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn fetch_top_level_comments(
        &self,
        post: &PostId,
    ) -> Result<Vec<CommentRow>, StoreError> {
        let rows = sqlx::query(
            "
                SELECT
                    c.id, c.post_id, c.parent_id, c.user_id, c.guest_nickname,
                    c.content, c.created_at, c.updated_at, c.like_count,
                    p.id AS profile_id,
                    p.username AS profile_username,
                    p.avatar_url AS profile_avatar_url
                FROM comments c
                LEFT JOIN profiles p
                    ON p.id = c.user_id
                WHERE c.post_id = $1
                    AND c.parent_id IS NULL
                ORDER BY c.created_at DESC
            ",
        )
        .bind(post.as_str())
        .fetch_all(&self.pool)
        .await
        .store_context("querying top-level comments")?;
        rows.iter()
            .map(comment_row)
            .collect::<Result<Vec<_>, _>>()
            .store_context("parsing top-level comments")
    }

    async fn fetch_replies(
        &self,
        post: &PostId,
        parents: &HashSet<CommentId>,
    ) -> Result<Vec<CommentRow>, StoreError> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "
                SELECT
                    c.id, c.post_id, c.parent_id, c.user_id, c.guest_nickname,
                    c.content, c.created_at, c.updated_at, c.like_count,
                    p.id AS profile_id,
                    p.username AS profile_username,
                    p.avatar_url AS profile_avatar_url
                FROM comments c
                LEFT JOIN profiles p
                    ON p.id = c.user_id
                WHERE c.post_id = $1
                    AND c.parent_id = ANY($2)
                ORDER BY c.created_at ASC
            ",
        )
        .bind(post.as_str())
        .bind(id_list(parents))
        .fetch_all(&self.pool)
        .await
        .store_context("querying replies")?;
        rows.iter()
            .map(comment_row)
            .collect::<Result<Vec<_>, _>>()
            .store_context("parsing replies")
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
        let rows = sqlx::query(
            "
                SELECT comment_id
                FROM comment_likes
                WHERE liker_id = $1
                    AND comment_id = ANY($2)
            ",
        )
        .bind(viewer.as_str())
        .bind(id_list(comments))
        .fetch_all(&self.pool)
        .await
        .store_context("querying likes")?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("comment_id").map(CommentId))
            .collect::<Result<HashSet<_>, _>>()
            .store_context("parsing likes")
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<CommentId, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .store_context("starting comment insertion transaction")?;
        if let Some(parent) = &comment.parent_id {
            let row = sqlx::query("SELECT parent_id FROM comments WHERE id = $1 AND post_id = $2")
                .bind(parent.as_str())
                .bind(comment.post_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .store_context("querying parent comment")?
                .ok_or_else(|| StoreError::UnknownParent(parent.clone()))?;
            let grandparent = row
                .try_get::<Option<String>, _>("parent_id")
                .store_context("parsing parent comment")?;
            if grandparent.is_some() {
                return Err(StoreError::ReplyToReply(parent.clone()));
            }
        }
        let id = CommentId::new_random();
        sqlx::query(
            "
                INSERT INTO comments
                    (id, post_id, parent_id, user_id, guest_nickname, content, created_at, like_count)
                VALUES ($1, $2, $3, $4, $5, $6, now(), 0)
            ",
        )
        .bind(id.as_str())
        .bind(comment.post_id.as_str())
        .bind(comment.parent_id.as_ref().map(CommentId::as_str))
        .bind(comment.user_id().map(UserId::as_str))
        .bind(comment.guest_nickname())
        .bind(comment.content.as_str())
        .execute(&mut *tx)
        .await
        .store_context("inserting comment")?;
        tx.commit()
            .await
            .store_context("committing comment insertion")?;
        tracing::debug!(comment = %id, post = %comment.post_id, "inserted comment");
        Ok(id)
    }

    async fn set_like(
        &self,
        viewer: &ViewerId,
        comment: &CommentId,
        liked: bool,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .store_context("starting like transaction")?;
        sqlx::query("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
            .bind(comment.as_str())
            .fetch_optional(&mut *tx)
            .await
            .store_context("locking liked comment")?
            .ok_or_else(|| StoreError::UnknownComment(comment.clone()))?;
        let query = match liked {
            true => {
                "INSERT INTO comment_likes (comment_id, liker_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            }
            false => "DELETE FROM comment_likes WHERE comment_id = $1 AND liker_id = $2",
        };
        let changed = sqlx::query(query)
            .bind(comment.as_str())
            .bind(viewer.as_str())
            .execute(&mut *tx)
            .await
            .store_context("recording like")?
            .rows_affected();
        if changed > 0 {
            let delta: i32 = if liked { 1 } else { -1 };
            sqlx::query(
                "UPDATE comments SET like_count = GREATEST(like_count + $2, 0) WHERE id = $1",
            )
            .bind(comment.as_str())
            .bind(delta)
            .execute(&mut *tx)
            .await
            .store_context("updating like count")?;
        }
        tx.commit().await.store_context("committing like")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Never actually connected to: lookups with nothing to look up must not
    // touch the pool
    fn lazy_gateway() -> PgGateway {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://nobody@127.0.0.1:1/nothing")
            .expect("building lazy pool");
        PgGateway::new(pool)
    }

    #[tokio::test]
    async fn empty_lookups_do_not_query() {
        let gw = lazy_gateway();
        let post = PostId::from("post");
        let none = HashSet::new();
        let some = [CommentId::from("a")].into_iter().collect();
        assert!(gw.fetch_replies(&post, &none).await.unwrap().is_empty());
        assert!(gw
            .fetch_liked_comment_ids(None, &some)
            .await
            .unwrap()
            .is_empty());
        assert!(gw
            .fetch_liked_comment_ids(Some(&ViewerId::from("v")), &none)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn errors_are_classified() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut, "ctx"),
            StoreError::Transport(_)
        ));
        assert!(matches!(
            store_error(
                sqlx::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused"
                )),
                "ctx"
            ),
            StoreError::Transport(_)
        ));
        match store_error(sqlx::Error::RowNotFound, "fetching things") {
            StoreError::Other(e) => assert_eq!(e.to_string(), "fetching things"),
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn id_list_keeps_every_id() {
        let ids = [CommentId::from("a"), CommentId::from("b")]
            .into_iter()
            .collect::<HashSet<_>>();
        let mut list = id_list(&ids);
        list.sort();
        assert_eq!(list, vec![String::from("a"), String::from("b")]);
    }
}
