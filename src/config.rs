//! 設定ストア
//!
//! キー → 文字列のフラットなマップを JSON ファイルに保存する。
//! プロセス開始時に1つ作って参照で渡す（グローバルにはしない）。
//! ファイルは最初のアクセス時に読み込む。入力中の書き込み間引きは呼び出し側の責務。

use crate::error::{CatalogError, Result};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// 部品データベースのベースパス
pub const PARTS_PATH_KEY: &str = "parts_path";
/// Mouser APIキー
pub const MOUSER_API_KEY: &str = "mouser_api_key";
/// APIキーの環境変数（設定ファイルより優先）
pub const MOUSER_API_KEY_ENV: &str = "MOUSER_API_KEY";

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    values: OnceCell<Mutex<BTreeMap<String, String>>>,
    credential_env: Option<String>,
}

impl SettingsStore {
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Self::default_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: OnceCell::new(),
            credential_env: Some(MOUSER_API_KEY_ENV.to_string()),
        }
    }

    /// APIキーを上書きする環境変数を差し替える（`None` で無効）
    pub fn with_credential_env(mut self, var: Option<&str>) -> Self {
        self.credential_env = var.map(str::to_string);
        self
    }

    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| CatalogError::Config("設定ディレクトリが見つかりません".into()))?;
        Ok(dir.join("parts-catalog").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    /// 値を設定して即座に保存（後勝ち、同じ値なら書き込まない）
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values();
        if values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());
        self.save(&values)?;
        tracing::info!(key, path = %self.path.display(), "setting saved");
        Ok(())
    }

    /// キーを削除。存在したかどうかを返す
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values();
        if values.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&values)?;
        Ok(true)
    }

    pub fn all(&self) -> BTreeMap<String, String> {
        self.values().clone()
    }

    /// 空でないベースパス
    pub fn parts_path(&self) -> Option<String> {
        self.get(PARTS_PATH_KEY).filter(|p| !p.trim().is_empty())
    }

    pub fn mouser_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Some(key) = self.credential_env.as_deref().and_then(|var| std::env::var(var).ok()) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.get(MOUSER_API_KEY)
            .filter(|k| !k.trim().is_empty())
            .ok_or(CatalogError::MissingCredential)
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values
            .get_or_init(|| Mutex::new(read_settings_file(&self.path)))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// 設定ファイルを読み込む。存在しない・壊れている場合は空
fn read_settings_file(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return BTreeMap::new(),
    };

    let object: Map<String, Value> = match serde_json::from_str(&content) {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "settings file unreadable, starting empty");
            return BTreeMap::new();
        }
    };

    object
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            Value::Bool(_) | Value::Number(_) => Some((k, v.to_string())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = SettingsStore::at(dir.path().join("settings.json"));
        assert!(store.get(PARTS_PATH_KEY).is_none());
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"parts_path":"/srv/parts","retries":3,"nested":{"a":1}}"#).unwrap();

        let store = SettingsStore::at(&path);
        assert_eq!(store.get("parts_path").as_deref(), Some("/srv/parts"));
        assert_eq!(store.get("retries").as_deref(), Some("3"));
        assert!(store.get("nested").is_none());
    }

    #[test]
    fn test_blank_parts_path_is_unset() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = SettingsStore::at(dir.path().join("settings.json"));
        store.set(PARTS_PATH_KEY, "  ").unwrap();
        assert!(store.parts_path().is_none());
    }

    #[test]
    fn test_api_key_without_env_override() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = SettingsStore::at(dir.path().join("settings.json")).with_credential_env(None);
        assert!(matches!(store.mouser_api_key(), Err(CatalogError::MissingCredential)));

        store.set(MOUSER_API_KEY, "stored-key").unwrap();
        assert_eq!(store.mouser_api_key().unwrap(), "stored-key");
    }

    #[test]
    fn test_api_key_env_override_wins() {
        let dir = tempdir().expect("Failed to create temp dir");
        // PATH は常に設定されている
        let expected = std::env::var("PATH").expect("PATH not set");
        let store = SettingsStore::at(dir.path().join("settings.json")).with_credential_env(Some("PATH"));
        store.set(MOUSER_API_KEY, "stored-key").unwrap();
        assert_eq!(store.mouser_api_key().unwrap(), expected);
    }
}
