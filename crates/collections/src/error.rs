//! Collection error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("peek or pop from an empty priority collection")]
    Empty,
}
