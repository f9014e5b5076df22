//! ヘッダー照合モジュール
//!
//! 外部ルックアップの正規キー（`SPN`, `Datasheet` など）を
//! テーブルのヘッダー表記に対応付ける。表記ゆれはエイリアス表で吸収する。

use crate::error::{Error, Result};
use crate::types::{AttributeMap, PartRecord};
use serde::{Deserialize, Serialize};

/// 比較用の正規化: 小文字化し、空白・`-`・`_` を除去
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// エイリアス定義（正規キー → 正規化済みエイリアスのリスト、記載順に試行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default)]
    entries: Vec<AliasEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::supplier_preset()
    }
}

impl AliasTable {
    /// エイリアスなし
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// 商社ルックアップ用プリセット
    pub fn supplier_preset() -> Self {
        Self::empty()
            .with_aliases("SPN", &["supplierpartnumber", "mousernumber", "suppliercode"])
            .with_aliases("Datasheet", &["datasheeturl", "datasheetlink"])
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        if table.entries.iter().any(|e| e.canonical.trim().is_empty()) {
            return Err(Error::Config("エイリアスの正規キーが空です".into()));
        }
        Ok(table)
    }

    /// エイリアスを追加（同じ正規キーがあれば末尾に追記）
    pub fn with_aliases(mut self, canonical: &str, aliases: &[&str]) -> Self {
        self.add_aliases(canonical, aliases.iter().map(|a| normalize(a)));
        self
    }

    /// 設定をマージ（同じ正規キーはエイリアスを追記）
    pub fn merge(&mut self, other: &AliasTable) {
        for entry in &other.entries {
            self.add_aliases(&entry.canonical, entry.aliases.iter().map(|a| normalize(a)));
        }
    }

    fn add_aliases(&mut self, canonical: &str, aliases: impl Iterator<Item = String>) {
        let key = normalize(canonical);
        match self.entries.iter().position(|e| normalize(&e.canonical) == key) {
            Some(idx) => self.entries[idx].aliases.extend(aliases),
            None => self.entries.push(AliasEntry {
                canonical: canonical.to_string(),
                aliases: aliases.collect(),
            }),
        }
    }

    /// キーが属するエイリアスグループの候補（正規化済み、正規キー → エイリアスの順）
    ///
    /// 対応は双方向: `Datasheet` からも `DataSheetUrl` からも同じグループを引く。
    pub fn candidates_for(&self, key: &str) -> Vec<String> {
        let key = normalize(key);
        self.entries
            .iter()
            .filter(|e| normalize(&e.canonical) == key || e.aliases.iter().any(|a| normalize(a) == key))
            .flat_map(|e| std::iter::once(normalize(&e.canonical)).chain(e.aliases.iter().map(|a| normalize(a))))
            .collect()
    }

    /// 属性キーに対応するヘッダーを探す
    ///
    /// 直接一致を優先し、なければエイリアスグループを記載順に試す。
    pub fn match_header<'h>(&self, headers: &'h [String], key: &str) -> Option<&'h str> {
        self.match_index(headers, key).map(|idx| headers[idx].as_str())
    }

    fn match_index(&self, headers: &[String], key: &str) -> Option<usize> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
        let direct = normalize(key);

        normalized.iter().position(|h| *h == direct).or_else(|| {
            self.candidates_for(key)
                .iter()
                .find_map(|candidate| normalized.iter().position(|h| h == candidate))
        })
    }

    /// 外部属性をヘッダーへ照合
    ///
    /// 一致しない属性と空の値は黙って捨てる（スキーマは広げない）。
    /// 同じヘッダーに複数の属性が当たった場合は後勝ち。
    /// 戻り値はヘッダー順。
    pub fn reconcile(&self, headers: &[String], attrs: &AttributeMap) -> Vec<(String, String)> {
        let mut matched: Vec<Option<String>> = vec![None; headers.len()];

        for (key, value) in attrs.iter() {
            if value.trim().is_empty() {
                continue;
            }
            if let Some(idx) = self.match_index(headers, key) {
                matched[idx] = Some(value.to_string());
            }
        }

        headers
            .iter()
            .zip(matched)
            .filter_map(|(h, v)| v.map(|v| (h.clone(), v)))
            .collect()
    }
}

/// デフォルトのエイリアス表で照合
pub fn reconcile(headers: &[String], attrs: &AttributeMap) -> Vec<(String, String)> {
    AliasTable::default().reconcile(headers, attrs)
}

/// 照合結果をレコードへ反映
///
/// 空の値は既存の入力を上書きしない。反映したヘッダー数を返す。
pub fn merge_into_record(record: &mut PartRecord, matches: &[(String, String)]) -> usize {
    let mut applied = 0;
    for (header, value) in matches {
        if value.trim().is_empty() {
            continue;
        }
        record.insert(header.clone(), value.clone());
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Data Sheet-URL"), "datasheeturl");
        assert_eq!(normalize(" Supplier_Part Number "), "supplierpartnumber");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in ["MPN", "Mouser  Number", "data_sheet-link", "ÄBC d", "\tIPN\n"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_direct_match_preferred_over_alias() {
        let table = AliasTable::default();
        let headers = headers(&["Datasheet URL", "Datasheet"]);
        assert_eq!(table.match_header(&headers, "Datasheet"), Some("Datasheet"));
    }

    #[test]
    fn test_alias_order() {
        let table = AliasTable::default();
        let headers = headers(&["Supplier Code", "Mouser Number"]);
        // エイリアスの記載順（mousernumber が suppliercode より先）
        assert_eq!(table.match_header(&headers, "SPN"), Some("Mouser Number"));
    }

    #[test]
    fn test_reconcile_scenario() {
        let headers = headers(&["MPN", "Description", "DataSheetUrl"]);
        let attrs: AttributeMap = [
            ("ManufacturerPartNumber", ""),
            ("Description", "10k resistor"),
            ("Datasheet", "http://x/d.pdf"),
        ]
        .into_iter()
        .collect();

        let matched = reconcile(&headers, &attrs);
        assert_eq!(
            matched,
            vec![
                ("Description".to_string(), "10k resistor".to_string()),
                ("DataSheetUrl".to_string(), "http://x/d.pdf".to_string()),
            ]
        );
    }

    #[test]
    fn test_reconcile_alias_spelled_attribute() {
        let headers = headers(&["MPN", "Description", "Datasheet"]);
        let attrs: AttributeMap = [
            ("ManufacturerPartNumber", ""),
            ("Description", "10k resistor"),
            ("DataSheetUrl", "http://x/d.pdf"),
        ]
        .into_iter()
        .collect();

        let matched = reconcile(&headers, &attrs);
        assert_eq!(
            matched,
            vec![
                ("Description".to_string(), "10k resistor".to_string()),
                ("Datasheet".to_string(), "http://x/d.pdf".to_string()),
            ]
        );
        assert!(!matched.iter().any(|(h, _)| h == "MPN"));
    }

    #[test]
    fn test_reconcile_later_attribute_wins() {
        let table = AliasTable::empty().with_aliases("Vendor", &["supplier"]);
        let headers = headers(&["Supplier"]);
        let attrs: AttributeMap = [("Supplier", "Mouser"), ("Vendor", "Digikey")].into_iter().collect();

        assert_eq!(
            table.reconcile(&headers, &attrs),
            vec![("Supplier".to_string(), "Digikey".to_string())]
        );
    }

    #[test]
    fn test_reconcile_deterministic() {
        let headers = headers(&["SPN", "Manufacturer", "Datasheet Link", "Supplier"]);
        let attrs: AttributeMap = [
            ("Supplier", "Mouser"),
            ("SPN", "603-RC0603FR-0710KL"),
            ("Manufacturer", "YAGEO"),
            ("Datasheet", "http://x/d.pdf"),
        ]
        .into_iter()
        .collect();

        let first = reconcile(&headers, &attrs);
        for _ in 0..10 {
            assert_eq!(reconcile(&headers, &attrs), first);
        }
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_merge_skips_empty_values() {
        let mut record = PartRecord::new();
        record.insert("MPN".into(), "typed by user".into());
        record.insert("Description".into(), String::new());

        let applied = merge_into_record(
            &mut record,
            &[
                ("MPN".to_string(), "  ".to_string()),
                ("Description".to_string(), "10k resistor".to_string()),
            ],
        );

        assert_eq!(applied, 1);
        assert_eq!(record["MPN"], "typed by user");
        assert_eq!(record["Description"], "10k resistor");
    }

    #[test]
    fn test_merge_appends_aliases() {
        let mut table = AliasTable::default();
        table.merge(&AliasTable::empty().with_aliases("SPN", &["vendor part"]).with_aliases("MPN", &["mfrpart"]));

        assert_eq!(
            table.candidates_for("SPN"),
            vec!["spn", "supplierpartnumber", "mousernumber", "suppliercode", "vendorpart"]
        );
        assert_eq!(table.candidates_for("mfr part"), vec!["mpn", "mfrpart"]);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"entries":[{"canonical":"MPN","aliases":["mfrpart","manufacturerpartnumber"]}]}"#;
        let table = AliasTable::from_json(json).unwrap();
        let headers = headers(&["Mfr Part"]);
        assert_eq!(table.match_header(&headers, "MPN"), Some("Mfr Part"));

        assert!(AliasTable::from_json(r#"{"entries":[{"canonical":" ","aliases":[]}]}"#).is_err());
    }
}
