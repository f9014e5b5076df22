//! 部品テーブルの読み書き
//!
//! 読み込みはファイル全体を読んでパースする。
//! 追記は1行を1回の書き込みで末尾に足すだけで、全体を読み直さない。
//! 同じパスへの読み書きはパスごとの非同期ロックで直列化する（プロセス内のみ）。

use crate::error::{CatalogError, Result};
use parts_catalog_common::{format_header_line, format_record_line, CatalogTable, PartRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// テーブルを読み込む
///
/// 空ファイルはエラーではなく空のテーブル。
pub async fn load(path: &Path) -> Result<CatalogTable> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CatalogError::from_io(path, e))?;

    let content = String::from_utf8(bytes).map_err(|e| {
        CatalogError::MalformedInput(format!("{}: UTF-8ではありません ({})", path.display(), e))
    })?;

    let table = CatalogTable::parse(&content);
    tracing::debug!(
        path = %path.display(),
        headers = table.headers().len(),
        rows = table.rows().len(),
        "table loaded"
    );
    Ok(table)
}

/// 追記を直列化するテーブルストア
///
/// アプリ全体で1つ作って共有する。
#[derive(Debug, Default)]
pub struct TableStore {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追記中の行を途中まで読まないよう、同じロックを取って読み込む
    pub async fn load(&self, path: &Path) -> Result<CatalogTable> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;
        load(path).await
    }

    /// レコードを1行追記
    ///
    /// ヘッダー順に射影し、値中のカンマは `;` に置換する。
    /// ファイルがなければヘッダーなしで作成する。
    /// 失敗しても自動で再試行しない（重複行を防ぐため）。
    pub async fn append_record(&self, path: &Path, record: &PartRecord, headers: &[String]) -> Result<()> {
        if headers.is_empty() {
            return Err(CatalogError::MalformedInput(format!(
                "{}: ヘッダーがないため追記できません",
                path.display()
            )));
        }

        let line = format_record_line(record, headers);
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        append_line(path, &line).await?;
        tracing::debug!(path = %path.display(), "record appended");
        Ok(())
    }

    /// ヘッダー行だけのテーブルを作成
    ///
    /// 既に内容のあるファイルには書かない。
    pub async fn create_table(&self, path: &Path, headers: &[String]) -> Result<()> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(CatalogError::MalformedInput("ヘッダーが空です".into()));
        }

        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => {
                return Err(CatalogError::TableExists(path.display().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CatalogError::from_io(path, e)),
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CatalogError::from_io(parent, e))?;
        }

        append_line(path, &format_header_line(headers)).await?;
        tracing::info!(path = %path.display(), columns = headers.len(), "table created");
        Ok(())
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // 誰も持っていないロックは捨てる（マップを握っている間は増えない）
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

/// 1行を末尾に書き込む
///
/// 既存ファイルが改行で終わっていなければ先に改行を補う。
/// ハンドルは操作ごとに開いて閉じる。
async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .await
        .map_err(|e| CatalogError::from_io(path, e))?;

    let len = file.metadata().await?.len();
    let mut buf = String::with_capacity(line.len() + 2);
    if len > 0 {
        file.seek(std::io::SeekFrom::Start(len - 1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            buf.push('\n');
        }
    }
    buf.push_str(line);
    buf.push('\n');

    file.write_all(buf.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
