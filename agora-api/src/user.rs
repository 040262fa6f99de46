string_id!(UserId);

string_id!(
    /// Key under which likes are recorded: either an authenticated user id or
    /// the opaque token a guest keeps in local storage
    ViewerId
);

impl From<UserId> for ViewerId {
    fn from(u: UserId) -> ViewerId {
        ViewerId(u.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProfileRow {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}
