//! カタログの型定義
//!
//! - CategoryNode: カテゴリツリー（ディレクトリ構造の写し）
//! - PartRecord: 編集中の部品レコード（ヘッダー名 → 値）
//! - AttributeMap: 外部ルックアップ結果（正規キー → 値、挿入順を保持）

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 部品レコード。値は常に文字列で、型変換はしない。
pub type PartRecord = HashMap<String, String>;

/// カテゴリツリーのノード
///
/// `children` が空ならリーフ（テーブルを1つ持つカテゴリ）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// 子孫のリーフカテゴリを `a/b/c` 形式で列挙（ルート自身の名前は含まない）
    pub fn category_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for child in &self.children {
            child.collect_leaves("", &mut paths);
        }
        paths
    }

    fn collect_leaves(&self, parent: &str, out: &mut Vec<String>) {
        let path = if parent.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", parent, self.name)
        };

        if self.is_leaf() {
            out.push(path);
        } else {
            for child in &self.children {
                child.collect_leaves(&path, out);
            }
        }
    }

    /// `a/b/c` 形式のパスで子孫ノードを検索
    pub fn find(&self, category: &str) -> Option<&CategoryNode> {
        let mut node = self;
        for segment in category.split('/').filter(|s| !s.is_empty()) {
            node = node.children.iter().find(|c| c.name == segment)?;
        }
        Some(node)
    }
}

/// 外部ルックアップの結果
///
/// キーは正規名（`Supplier`, `MPN`, `Datasheet` など）。
/// 照合時の後勝ちルールのため挿入順を保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加。同じキーが既にあれば値を置き換える（位置は維持）。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> CategoryNode {
        CategoryNode {
            name: "database".into(),
            children: vec![
                CategoryNode {
                    name: "passives".into(),
                    children: vec![CategoryNode::new("resistors"), CategoryNode::new("capacitors")],
                },
                CategoryNode::new("connectors"),
            ],
        }
    }

    #[test]
    fn test_category_paths() {
        let tree = sample_tree();
        assert_eq!(
            tree.category_paths(),
            vec!["passives/resistors", "passives/capacitors", "connectors"]
        );
    }

    #[test]
    fn test_find() {
        let tree = sample_tree();
        assert_eq!(tree.find("passives/capacitors").map(|n| n.name.as_str()), Some("capacitors"));
        assert!(tree.find("passives/inductors").is_none());
        assert!(tree.find("passives").is_some_and(|n| !n.is_leaf()));
    }

    #[test]
    fn test_attribute_map_keeps_insertion_order() {
        let mut attrs = AttributeMap::new();
        attrs.insert("MPN", "RC0603");
        attrs.insert("Supplier", "Mouser");
        attrs.insert("MPN", "RC0805");

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["MPN", "Supplier"]);
        assert_eq!(attrs.get("MPN"), Some("RC0805"));
        assert_eq!(attrs.len(), 2);
    }
}
