use crate::api::{Error as ApiError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Invalid(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
