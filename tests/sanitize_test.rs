//! データシートPDF修復の統合テスト

use lopdf::{dictionary, Document, Object};
use parts_catalog::error::Result;
use parts_catalog::sanitize;
use parts_catalog::supplier::ByteFetcher;

fn minimal_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("Failed to build test pdf");
    buf
}

/// 構造を解析できない入力はそのまま返る
#[test]
fn test_malformed_bytes_returned_unchanged() {
    let html = b"<html><body>404 Not Found</body></html>".to_vec();
    assert_eq!(sanitize::sanitize(&html), html);

    assert!(sanitize::sanitize(&[]).is_empty());
}

/// 正常なPDFは読み直せる形で書き出される
#[test]
fn test_valid_pdf_is_rewritten() {
    let input = minimal_pdf();
    let output = sanitize::sanitize(&input);

    assert!(output.starts_with(b"%PDF-"));
    let reloaded = Document::load_mem(&output).expect("sanitized pdf should parse");
    assert_eq!(reloaded.get_pages().len(), 1);
}

struct StaticFetcher(Vec<u8>);

impl ByteFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// 取得したデータシートも修復を通る
#[tokio::test]
async fn test_fetch_datasheet_falls_back_to_original() {
    let fetcher = StaticFetcher(b"not a pdf".to_vec());
    let bytes = sanitize::fetch_datasheet(&fetcher, "https://example.com/d.pdf").await.unwrap();
    assert_eq!(bytes, b"not a pdf");

    let uri = sanitize::to_data_uri(&bytes);
    assert_eq!(sanitize::from_data_uri(&uri).unwrap(), bytes);
}
