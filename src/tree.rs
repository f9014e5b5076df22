//! カテゴリツリー
//!
//! `<base>/database` 以下のディレクトリ構造をそのままツリーにする。
//! リーフディレクトリは部品テーブル（CSV）を1つ持つカテゴリ。

use crate::error::{CatalogError, Result};
use parts_catalog_common::CategoryNode;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DATABASE_DIR: &str = "database";
const TABLE_EXTENSION: &str = "csv";

/// ツリー再構築の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    /// ベースパスが未設定
    Unconfigured,
    /// ベースパスは設定済みだが読めなかった
    Invalid { path: PathBuf, reason: String },
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogScan {
    pub root: Option<PathBuf>,
    pub tree: CategoryNode,
    #[serde(flatten)]
    pub status: ScanStatus,
}

impl CatalogScan {
    pub fn is_ready(&self) -> bool {
        self.status == ScanStatus::Ready
    }

    /// 画面表示用のメッセージ
    pub fn message(&self) -> Option<String> {
        match &self.status {
            ScanStatus::Unconfigured => {
                Some("部品データベースのパスが未設定です。`parts-catalog config --set-parts-path` で設定してください".into())
            }
            ScanStatus::Invalid { path, reason } => {
                Some(format!("カタログを読み込めません: {} ({})", path.display(), reason))
            }
            ScanStatus::Ready => None,
        }
    }
}

/// ベースパスからデータベースのルートを決める
///
/// 区切りは `/` に統一し、末尾が既に `database` ならそのまま使う。
pub fn database_root(base_path: &str) -> Option<PathBuf> {
    let normalized = base_path.trim().replace('\\', "/");
    let trimmed = normalized.trim_end_matches('/');
    if trimmed.is_empty() {
        // "/" のみの指定はルートディレクトリとして扱う
        return (!normalized.is_empty()).then(|| PathBuf::from("/").join(DATABASE_DIR));
    }

    let ends_with_database = trimmed
        .rsplit('/')
        .next()
        .is_some_and(|last| last.eq_ignore_ascii_case(DATABASE_DIR));

    if ends_with_database {
        Some(PathBuf::from(trimmed))
    } else {
        Some(Path::new(trimmed).join(DATABASE_DIR))
    }
}

/// ベースパスからツリーを再構築（失敗しても空のツリーを返す）
pub fn scan_catalog(base_path: &str) -> CatalogScan {
    let Some(root) = database_root(base_path) else {
        return CatalogScan {
            root: None,
            tree: CategoryNode::new(DATABASE_DIR),
            status: ScanStatus::Unconfigured,
        };
    };

    match build_tree(&root) {
        Ok(tree) => {
            tracing::debug!(root = %root.display(), leaves = tree.category_paths().len(), "catalog tree built");
            CatalogScan {
                root: Some(root),
                tree,
                status: ScanStatus::Ready,
            }
        }
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "catalog tree rebuild failed");
            CatalogScan {
                tree: CategoryNode::new(DATABASE_DIR),
                status: ScanStatus::Invalid {
                    path: root.clone(),
                    reason: e.to_string(),
                },
                root: Some(root),
            }
        }
    }
}

/// ディレクトリを再帰的に読んでツリーを作る
///
/// ファイルは無視する。兄弟の順序はファイル名順。
/// 空のパス（未設定）は子のないルートを返す。
pub fn build_tree(root: &Path) -> Result<CategoryNode> {
    if root.as_os_str().is_empty() {
        return Ok(CategoryNode::new(DATABASE_DIR));
    }
    if !root.is_dir() {
        return Err(CatalogError::InvalidCatalogPath {
            path: root.display().to_string(),
            reason: "ディレクトリではありません".into(),
        });
    }

    read_node(root, node_name(root, DATABASE_DIR))
}

fn read_node(dir: &Path, name: String) -> Result<CategoryNode> {
    let mut children = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)  // 直下のみ、再帰は自前で行う
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| CatalogError::InvalidCatalogPath {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_dir() {
            continue;
        }

        let child_name = node_name(entry.path(), "unknown");
        children.push(read_node(entry.path(), child_name)?);
    }

    Ok(CategoryNode { name, children })
}

fn node_name(path: &Path, fallback: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// リーフカテゴリのディレクトリ
pub fn category_dir(database_root: &Path, category: &str) -> PathBuf {
    category
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .fold(database_root.to_path_buf(), |path, segment| path.join(segment))
}

/// カテゴリのテーブルファイルを決める
///
/// ディレクトリ内の `.csv`（ファイル名順で最初のもの）。
/// なければ `<カテゴリ名>.csv` を作成先として返す。
pub fn resolve_table_path(database_root: &Path, category: &str) -> Result<PathBuf> {
    let dir = category_dir(database_root, category);
    if !dir.is_dir() {
        return Err(CatalogError::NotFound(format!("カテゴリ {}", category)));
    }

    let existing = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION))
        });

    match existing {
        Some(entry) => Ok(entry.into_path()),
        None => {
            let name = node_name(&dir, "table");
            Ok(dir.join(format!("{}.{}", name, TABLE_EXTENSION)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_root() {
        assert_eq!(database_root(""), None);
        assert_eq!(database_root("   "), None);
        assert_eq!(database_root("/home/u/dz_parts"), Some(PathBuf::from("/home/u/dz_parts/database")));
        assert_eq!(database_root("/home/u/dz_parts/"), Some(PathBuf::from("/home/u/dz_parts/database")));
        assert_eq!(database_root("/home/u/dz_parts/Database/"), Some(PathBuf::from("/home/u/dz_parts/Database")));
        assert_eq!(database_root(r"C:\parts"), Some(PathBuf::from("C:/parts/database")));
    }

    #[test]
    fn test_category_dir_ignores_traversal() {
        let root = Path::new("/db");
        assert_eq!(category_dir(root, "passives/resistors"), PathBuf::from("/db/passives/resistors"));
        assert_eq!(category_dir(root, "../etc//passwd"), PathBuf::from("/db/etc/passwd"));
    }

    #[test]
    fn test_scan_unconfigured() {
        let scan = scan_catalog("");
        assert_eq!(scan.status, ScanStatus::Unconfigured);
        assert!(scan.tree.children.is_empty());
        assert!(scan.message().is_some());
    }
}
