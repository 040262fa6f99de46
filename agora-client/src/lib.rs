mod assemble;
pub use assemble::{assemble, ANONYMOUS_NAME, ANONYMOUS_REPLY_NAME};

mod comment;
pub use comment::{comment_count, Author, Comment};

mod error;
pub use error::Error;

mod feed;
pub use feed::{CommentFeed, FetchTicket, Refresh};

mod presenter;
pub use presenter::{Presented, Presenter};

pub mod api {
    pub use agora_api::*;
}

#[cfg(test)]
mod test_util;
