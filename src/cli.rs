use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parts-catalog")]
#[command(about = "部品カタログ（CSVテーブルのディレクトリツリー）の閲覧・追加ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 部品データベースのベースパス（省略時は設定値）
    #[arg(long, global = true)]
    pub base: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// カテゴリツリーを表示
    Tree {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// カテゴリの部品テーブルを表示
    Show {
        /// カテゴリ（例: passives/resistors）
        #[arg(required = true)]
        category: String,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// カテゴリにヘッダー行だけのテーブルを作成
    Init {
        /// カテゴリ
        #[arg(required = true)]
        category: String,

        /// ヘッダー（カンマ区切り）
        #[arg(long, required = true, value_delimiter = ',')]
        headers: Vec<String>,
    },

    /// 部品を1件追加
    Add {
        /// カテゴリ
        #[arg(required = true)]
        category: String,

        /// フィールド値 KEY=VALUE（キーは表記ゆれを許容）
        #[arg(short, long = "set")]
        set: Vec<FieldAssignment>,

        /// Mouserから部品情報を取得して補完
        #[arg(long)]
        fetch: bool,

        /// 各フィールドを対話的に入力
        #[arg(short, long)]
        interactive: bool,

        /// カスタムエイリアスファイル（JSON）
        #[arg(long)]
        alias: Option<PathBuf>,
    },

    /// データシートPDFを取得・修復
    Datasheet {
        /// URL またはローカルファイル
        #[arg(required = true)]
        source: String,

        /// 出力ファイル（省略時は data URI を標準出力へ）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 部品データベースのベースパスを設定
        #[arg(long)]
        set_parts_path: Option<String>,

        /// Mouser APIキーを設定
        #[arg(long)]
        set_mouser_key: Option<String>,

        /// 設定キーを削除
        #[arg(long)]
        remove: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// `KEY=VALUE` 形式のフィールド指定
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldAssignment {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for FieldAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(FieldAssignment {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("Invalid field: {}. Use KEY=VALUE", s)),
        }
    }
}
