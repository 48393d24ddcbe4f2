use thiserror::Error;

/// Errors related to support chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat room {0} not found")]
    RoomNotFound(i64),

    #[error("access to chat room {0} denied")]
    Forbidden(i64),

    #[error("chat room {0} is closed")]
    RoomClosed(i64),

    #[error("only customers can open support rooms")]
    NotCustomer,

    #[error("invalid message: {0}")]
    InvalidContent(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        ChatError::Storage(e.to_string())
    }
}

/// Errors from repository operations (used by trait definitions in storefront-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::RoomClosed(12);
        assert_eq!(err.to_string(), "chat room 12 is closed");
    }

    #[test]
    fn test_repository_error_converts_to_storage() {
        let err: ChatError = RepositoryError::Query("syntax error".to_string()).into();
        assert!(matches!(err, ChatError::Storage(ref msg) if msg == "query error: syntax error"));
    }
}
