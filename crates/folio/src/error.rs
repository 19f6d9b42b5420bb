use thiserror::Error;

use crate::page::PageId;

/// Failures reported by a rich-text engine while applying a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown node type '{0}'")]
    UnknownNode(String),
    #[error("node '{name}' cannot be placed here: {reason}")]
    InvalidPlacement { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("page {0} not found")]
    PageNotFound(PageId),
    #[error("page break could not be inserted: {0}")]
    InvalidMarkerInsertion(#[source] EngineError),
    #[error("no page ids left after {0}")]
    PageIdsExhausted(PageId),
    #[error("a document needs at least one page")]
    EmptyDocument,
    #[error("page id {0} appears more than once")]
    DuplicatePage(PageId),
}
