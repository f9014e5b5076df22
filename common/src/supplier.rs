//! 商社APIレスポンスの変換
//!
//! Mouser の部品検索結果（1件）を正規キーの属性マップへ変換する。

use crate::types::AttributeMap;
use serde_json::Value;

pub const MOUSER_SUPPLIER_NAME: &str = "Mouser";

/// 正規キー ← Mouser のフィールド名
const MOUSER_FIELDS: &[(&str, &str)] = &[
    ("SPN", "MouserPartNumber"),
    ("MPN", "ManufacturerPartNumber"),
    ("Manufacturer", "Manufacturer"),
    ("Description", "Description"),
    ("Datasheet", "DataSheetUrl"),
];

/// 検索レスポンス全体から先頭の部品を取り出す
pub fn first_mouser_part(response: &Value) -> Option<&Value> {
    response["SearchResults"]["Parts"].as_array()?.first()
}

/// 部品JSONを属性マップへ変換
///
/// 文字列以外の値や欠けているフィールドは空文字になる。
pub fn mouser_part_attributes(part: &Value) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    attrs.insert("Supplier", MOUSER_SUPPLIER_NAME);
    for (canonical, field) in MOUSER_FIELDS {
        let value = part.get(*field).and_then(Value::as_str).unwrap_or_default();
        attrs.insert(*canonical, value.trim());
    }
    attrs
}
