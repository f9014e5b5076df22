//! 商社ルックアップによるレコード補完
//!
//! 部品番号で外部APIを引き、結果をヘッダー照合してレコードへ反映する。
//! ダイアログが閉じられた後に届いた結果はリクエストトークンで捨てる。

use crate::config::SettingsStore;
use crate::error::{CatalogError, Result};
use crate::sanitize;
use crate::supplier::{ByteFetcher, SupplierLookup};
use parts_catalog_common::{merge_into_record, AliasTable, PartRecord};
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};

/// 非同期リクエストの世代管理
///
/// `begin` で新しいトークンを発行し、完了時に `is_current` で確認する。
/// `reset`（ダイアログを閉じた等）で発行済みトークンはすべて無効になる。
#[derive(Debug, Default)]
pub struct RequestGate {
    current: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.current.load(Ordering::SeqCst) == token
    }
}

/// 非同期処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated<T> {
    Applied(T),
    /// 別のリクエストが始まった、またはリセットされたため破棄
    Stale,
}

/// 補完の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub part_number: String,
    /// 値を反映したヘッダー（ヘッダー順）
    pub updated: Vec<String>,
    /// ルックアップ結果のデータシートURL
    pub datasheet_url: Option<String>,
}

/// 部品番号の入ったヘッダーを探して値を返す
///
/// `IPN`, `MPN`, `Part Number` などの最初の非空の値。
pub fn find_part_number(headers: &[String], record: &PartRecord) -> Option<String> {
    lazy_static::lazy_static! {
        static ref PART_NUMBER_RE: Regex = Regex::new(r"(?i)ipn|mpn|part.?number").unwrap();
    }

    headers
        .iter()
        .filter(|h| PART_NUMBER_RE.is_match(h))
        .filter_map(|h| record.get(h))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// データシートのリンクを入れるヘッダーか
pub fn is_datasheet_header(header: &str) -> bool {
    lazy_static::lazy_static! {
        static ref DATASHEET_RE: Regex = Regex::new(r"(?i)datasheet|pdf|link").unwrap();
    }

    DATASHEET_RE.is_match(header)
}

/// レコード中のデータシートURL（ヘッダー順で最初のもの）
pub fn datasheet_url(headers: &[String], record: &PartRecord) -> Option<String> {
    headers
        .iter()
        .filter(|h| is_datasheet_header(h))
        .filter_map(|h| record.get(h))
        .map(|v| v.trim())
        .find(|v| v.starts_with("http"))
        .map(str::to_string)
}

/// 補完ワークフロー
pub struct Enricher<'a, L> {
    settings: &'a SettingsStore,
    lookup: &'a L,
    aliases: AliasTable,
    lookup_gate: RequestGate,
    datasheet_gate: RequestGate,
}

impl<'a, L: SupplierLookup> Enricher<'a, L> {
    pub fn new(settings: &'a SettingsStore, lookup: &'a L) -> Self {
        Self {
            settings,
            lookup,
            aliases: AliasTable::default(),
            lookup_gate: RequestGate::new(),
            datasheet_gate: RequestGate::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// 商社ルックアップの世代
    pub fn lookup_gate(&self) -> &RequestGate {
        &self.lookup_gate
    }

    /// データシート取得の世代（ルックアップとは独立）
    pub fn datasheet_gate(&self) -> &RequestGate {
        &self.datasheet_gate
    }

    /// 待機中のリクエストをすべて無効にする（ダイアログを閉じたとき）
    pub fn reset(&self) {
        self.lookup_gate.reset();
        self.datasheet_gate.reset();
    }

    /// レコードを商社データで補完
    ///
    /// 部品番号・APIキーの確認、ルックアップ、照合、反映の順。
    /// 待機中に `reset()` されたら何も反映せず `Stale` を返す。
    pub async fn enrich(&self, headers: &[String], record: &mut PartRecord) -> Result<Gated<EnrichmentReport>> {
        let part_number = find_part_number(headers, record).ok_or(CatalogError::MissingPartNumber)?;
        let credential = self.settings.mouser_api_key()?;

        let token = self.lookup_gate.begin();
        let attrs = self
            .lookup
            .lookup(&part_number, &credential)
            .await?
            .ok_or_else(|| CatalogError::NoMatch(part_number.clone()))?;

        if !self.lookup_gate.is_current(token) {
            tracing::debug!(part_number = %part_number, "stale lookup result discarded");
            return Ok(Gated::Stale);
        }

        let matches = self.aliases.reconcile(headers, &attrs);
        merge_into_record(record, &matches);

        let updated: Vec<String> = matches
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(h, _)| h)
            .collect();
        let datasheet_url = attrs
            .get("Datasheet")
            .map(str::trim)
            .filter(|u| u.starts_with("http"))
            .map(str::to_string);

        tracing::info!(part_number = %part_number, updated = updated.len(), "record enriched");
        Ok(Gated::Applied(EnrichmentReport {
            part_number,
            updated,
            datasheet_url,
        }))
    }

    /// データシートを取得・修復（古いリクエストの結果は捨てる）
    pub async fn fetch_datasheet<F: ByteFetcher>(&self, fetcher: &F, url: &str) -> Result<Gated<Vec<u8>>> {
        let token = self.datasheet_gate.begin();
        let bytes = sanitize::fetch_datasheet(fetcher, url).await?;

        if !self.datasheet_gate.is_current(token) {
            return Ok(Gated::Stale);
        }
        Ok(Gated::Applied(bytes))
    }
}
