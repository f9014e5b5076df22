use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("Mouser APIキーが設定されていません。`parts-catalog config --set-mouser-key YOUR_KEY` で設定してください")]
    MissingCredential,

    #[error("見つかりません: {0}")]
    NotFound(String),

    #[error("カタログのパスが不正: {path} ({reason})")]
    InvalidCatalogPath { path: String, reason: String },

    #[error("不正な入力: {0}")]
    MalformedInput(String),

    #[error("テーブルは既に存在します: {0}")]
    TableExists(String),

    #[error("部品番号（IPN/MPN）が入力されていません")]
    MissingPartNumber,

    #[error("該当する部品が見つかりません: {0}")]
    NoMatch(String),

    #[error("HTTPエラー: {0}")]
    Http(String),

    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

/// UIへ返す失敗の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    IoError,
    MalformedInput,
    NoMatch,
    MissingCredential,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound(_) | CatalogError::InvalidCatalogPath { .. } => ErrorKind::NotFound,
            CatalogError::MalformedInput(_)
            | CatalogError::Json(_)
            | CatalogError::MissingPartNumber
            | CatalogError::Config(_) => ErrorKind::MalformedInput,
            CatalogError::NoMatch(_) => ErrorKind::NoMatch,
            CatalogError::MissingCredential => ErrorKind::MissingCredential,
            CatalogError::Io(_) | CatalogError::Http(_) | CatalogError::TableExists(_) => ErrorKind::IoError,
        }
    }

    /// パス付きでIOエラーを変換（NotFoundは種類を分ける）
    pub(crate) fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            CatalogError::NotFound(path.display().to_string())
        } else {
            CatalogError::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {}", path.display(), err),
            ))
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Http(err.to_string())
    }
}

impl From<parts_catalog_common::Error> for CatalogError {
    fn from(err: parts_catalog_common::Error) -> Self {
        match err {
            parts_catalog_common::Error::Io(e) => CatalogError::Io(e),
            parts_catalog_common::Error::Json(e) => CatalogError::Json(e),
            parts_catalog_common::Error::Config(msg) => CatalogError::Config(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
