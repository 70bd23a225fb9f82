//! 文档存储与清扫流程的错误类型。

use std::io;
use thiserror::Error;

use crate::document::DocumentRef;

/// Failures reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed store data: {0}")]
    Malformed(String),
    #[error("document not found: {0}")]
    MissingDocument(DocumentRef),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// 单次清扫中查询或提交阶段的失败。
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("query failed: {0}")]
    Query(#[source] StoreError),
    #[error("batch commit failed: {0}")]
    Commit(#[source] StoreError),
}
