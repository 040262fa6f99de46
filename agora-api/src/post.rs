string_id!(
    /// Identifier of a post, as handed out by the hosted store
    PostId
);
