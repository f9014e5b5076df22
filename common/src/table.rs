//! 部品テーブル（CSV）モジュール
//!
//! 1行目がヘッダー、以降が部品行。クォートは扱わない:
//! 読み込みは単純な `,` 分割、書き込みは値中の `,` を `;` に置換する。

use crate::types::PartRecord;
use serde::Serialize;

/// 書き込み時にカンマの代わりに使う文字
pub const COMMA_REPLACEMENT: char = ';';

/// 読み込んだテーブル
///
/// `headers` はロード後に変更しない。行はすべてヘッダーと同じキーを持つ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogTable {
    headers: Vec<String>,
    rows: Vec<PartRecord>,
}

impl CatalogTable {
    /// CSV文字列から読み込み
    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines().filter(|line| !line.trim().is_empty());

        let headers: Vec<String> = match lines.next() {
            Some(line) => split_fields(line).map(str::to_string).collect(),
            None => return Self::default(),
        };

        let rows = lines
            .map(|line| {
                let mut values = split_fields(line);
                // 短い行は空文字で埋め、長い行は切り捨てる
                headers
                    .iter()
                    .map(|h| (h.clone(), values.next().unwrap_or_default().to_string()))
                    .collect::<PartRecord>()
            })
            .collect();

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[PartRecord] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// ヘッダーをキーに持つ空レコード（追加フロー開始時）
    pub fn empty_record(&self) -> PartRecord {
        empty_record(&self.headers)
    }

    /// ヘッダー行を描画（ロード時と同じ順序）
    pub fn header_line(&self) -> String {
        self.headers.join(",")
    }
}

pub fn empty_record(headers: &[String]) -> PartRecord {
    headers.iter().map(|h| (h.clone(), String::new())).collect()
}

/// レコードをヘッダー順の1行に変換
///
/// ヘッダーにないキーは無視し、欠けているキーは空にする。
/// 出力のカンマ数は常に `headers.len() - 1`。
pub fn format_record_line(record: &PartRecord, headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| escape_field(record.get(h).map(String::as_str).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(",")
}

/// ヘッダー行を作成（ヘッダー名自体のカンマも置換）
pub fn format_header_line(headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| escape_field(h.trim()))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_field(value: &str) -> String {
    // 改行はレコード境界を壊すので空白に寄せる
    value
        .replace(',', &COMMA_REPLACEMENT.to_string())
        .replace(['\r', '\n'], " ")
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(str::trim)
}
