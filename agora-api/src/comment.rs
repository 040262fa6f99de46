use crate::{Error, PostId, ProfileRow, Time, UserId, Uuid};

pub const MAX_CONTENT_LEN: usize = 10_000;
pub const MAX_NICKNAME_LEN: usize = 50;

string_id!(CommentId);

impl CommentId {
    pub fn new_random() -> CommentId {
        CommentId(Uuid::new_v4().to_string())
    }
}

/// A comment row as returned by the store, with the author profile embedded
/// when it could be joined
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentRow {
    pub id: CommentId,
    pub post_id: PostId,
    #[serde(default)]
    pub parent_id: Option<CommentId>,

    /// None for guest-authored comments
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

    /// May be None even when user_id is set, if the profile does not exist (yet)
    #[serde(default)]
    pub profile: Option<ProfileRow>,

    /// Nested rows, only present if the store embedded them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentRow>,
}

impl CommentRow {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Authorship {
    User(UserId),
    Guest { nickname: Option<String> },
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub authorship: Authorship,
}

impl NewComment {
    pub fn new(
        post_id: PostId,
        parent_id: Option<CommentId>,
        content: String,
        authorship: Authorship,
    ) -> NewComment {
        // blank nicknames are stored as no nickname at all
        let authorship = match authorship {
            Authorship::Guest { nickname } => Authorship::Guest {
                nickname: nickname.filter(|n| !n.trim().is_empty()),
            },
            a => a,
        };
        NewComment {
            post_id,
            parent_id,
            content,
            authorship,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.content)?;
        if self.content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        let len = self.content.chars().count();
        if len > MAX_CONTENT_LEN {
            return Err(Error::ContentTooLong {
                len,
                max: MAX_CONTENT_LEN,
            });
        }
        if let Authorship::Guest {
            nickname: Some(nickname),
        } = &self.authorship
        {
            crate::validate_string(nickname)?;
            let len = nickname.chars().count();
            if len > MAX_NICKNAME_LEN {
                return Err(Error::NicknameTooLong {
                    len,
                    max: MAX_NICKNAME_LEN,
                });
            }
        }
        Ok(())
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match &self.authorship {
            Authorship::User(u) => Some(u),
            Authorship::Guest { .. } => None,
        }
    }

    pub fn guest_nickname(&self) -> Option<&str> {
        match &self.authorship {
            Authorship::User(_) => None,
            Authorship::Guest { nickname } => nickname.as_deref(),
        }
    }
}
