//! データシートPDFの修復
//!
//! 一部の商社が配布するPDFは相互参照表の欠落や空パスワードの暗号化など
//! 構造的な不備を含む。いったんパースして書き出し直すことで、
//! ビューアが開ける形に整える。失敗したら元のバイト列をそのまま返す。

use crate::error::{CatalogError, Result};
use crate::supplier::ByteFetcher;
use base64::{engine::general_purpose, Engine as _};
use lopdf::Document;
use std::panic::{self, AssertUnwindSafe};

pub const PDF_DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

/// PDFを正規化して書き出し直す（失敗時は入力をそのまま返す）
pub fn sanitize(bytes: &[u8]) -> Vec<u8> {
    // パーサー内部のpanicも失敗として扱う
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rewrite(bytes)));

    match outcome {
        Ok(Ok(repaired)) => {
            tracing::debug!(input = bytes.len(), output = repaired.len(), "pdf rewritten");
            repaired
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "pdf repair failed, returning original");
            bytes.to_vec()
        }
        Err(_) => {
            tracing::warn!("pdf parser panicked, returning original");
            bytes.to_vec()
        }
    }
}

fn rewrite(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(bytes).map_err(|e| CatalogError::MalformedInput(e.to_string()))?;

    if doc.is_encrypted() {
        // 空パスワードで開けるものだけ復号する
        doc.decrypt("")
            .map_err(|e| CatalogError::MalformedInput(format!("decrypt: {}", e)))?;
        doc.trailer.remove(b"Encrypt");
    }

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out)
        .map_err(|e| CatalogError::MalformedInput(e.to_string()))?;
    Ok(out)
}

/// ビューアに渡す data URI
pub fn to_data_uri(bytes: &[u8]) -> String {
    format!("{}{}", PDF_DATA_URI_PREFIX, general_purpose::STANDARD.encode(bytes))
}

/// data URI からバイト列を取り出す
pub fn from_data_uri(uri: &str) -> Result<Vec<u8>> {
    let encoded = uri
        .strip_prefix(PDF_DATA_URI_PREFIX)
        .ok_or_else(|| CatalogError::MalformedInput("PDFのdata URIではありません".into()))?;
    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CatalogError::MalformedInput(e.to_string()))
}

/// データシートを取得して修復
pub async fn fetch_datasheet<F: ByteFetcher>(fetcher: &F, url: &str) -> Result<Vec<u8>> {
    let bytes = fetcher.fetch(url).await?;
    Ok(sanitize(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        let uri = to_data_uri(b"%PDF-1.4");
        assert_eq!(uri, "data:application/pdf;base64,JVBERi0xLjQ=");
        assert_eq!(from_data_uri(&uri).unwrap(), b"%PDF-1.4");
        assert!(from_data_uri("data:text/plain;base64,AAAA").is_err());
    }
}
