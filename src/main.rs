use clap::Parser;
use dialoguer::Input;
use parts_catalog::{cli, config, enrich, error, sanitize, supplier, table, tree};
use parts_catalog_common::{AliasTable, CategoryNode, CatalogTable, PartRecord};
use cli::{Cli, Commands, FieldAssignment};
use config::SettingsStore;
use error::{CatalogError, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = SettingsStore::open_default()?;
    let store = table::TableStore::new();

    match cli.command {
        Commands::Tree { json } => {
            let base = base_path(cli.base.as_deref(), &settings);
            let scan = tree::scan_catalog(&base);
            if json {
                println!("{}", serde_json::to_string_pretty(&scan)?);
                return Ok(());
            }
            if let Some(message) = scan.message() {
                eprintln!("{}", message);
            }
            if let Some(root) = &scan.root {
                println!("{}", root.display());
            }
            print_tree(&scan.tree.children, 0);
        }

        Commands::Show { category, json } => {
            let path = table_path(cli.base.as_deref(), &settings, &category)?;
            let table = store.load(&path).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }

        Commands::Init { category, headers } => {
            let path = table_path(cli.base.as_deref(), &settings, &category)?;
            let headers: Vec<String> = headers
                .iter()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
            store.create_table(&path, &headers).await?;
            println!("✔ テーブルを作成しました: {}", path.display());
        }

        Commands::Add { category, set, fetch, interactive, alias } => {
            let path = table_path(cli.base.as_deref(), &settings, &category)?;
            let table = store.load(&path).await?;
            if table.is_empty() {
                return Err(CatalogError::MalformedInput(format!(
                    "{} にヘッダー行がありません。`parts-catalog init` で作成してください",
                    path.display()
                )));
            }

            // カスタムエイリアスはプリセットに追記
            let mut aliases = AliasTable::default();
            if let Some(file) = alias {
                aliases.merge(&AliasTable::from_json(&std::fs::read_to_string(file)?)?);
            }

            let headers = table.headers().to_vec();
            let mut record = table.empty_record();
            apply_assignments(&aliases, &headers, &mut record, &set);

            if fetch {
                println!("- Mouserから部品情報を取得中...");
                let client = supplier::MouserClient::new()?;
                let enricher = enrich::Enricher::new(&settings, &client).with_aliases(aliases.clone());
                if let enrich::Gated::Applied(report) = enricher.enrich(&headers, &mut record).await? {
                    println!("✔ {} の情報を反映: {}", report.part_number, report.updated.join(", "));
                }
            }

            if interactive {
                for header in &headers {
                    let current = record.get(header).cloned().unwrap_or_default();
                    let value: String = Input::new()
                        .with_prompt(header)
                        .with_initial_text(current)
                        .allow_empty(true)
                        .interact_text()
                        .map_err(|e| CatalogError::Io(std::io::Error::other(e.to_string())))?;
                    record.insert(header.clone(), value);
                }
            }

            store.append_record(&path, &record, &headers).await?;
            println!("✔ 部品を追加しました: {}", path.display());

            if let Some(url) = enrich::datasheet_url(&headers, &record) {
                println!("  データシート: {}", url);
            }
        }

        Commands::Datasheet { source, output } => {
            let bytes = if source.starts_with("http") {
                let fetcher = supplier::HttpFetcher::new()?;
                sanitize::fetch_datasheet(&fetcher, &source).await?
            } else {
                let raw = tokio::fs::read(&source)
                    .await
                    .map_err(|e| CatalogError::NotFound(format!("{}: {}", source, e)))?;
                sanitize::sanitize(&raw)
            };

            match output {
                Some(path) => {
                    tokio::fs::write(&path, &bytes).await?;
                    println!("✔ データシートを保存: {} ({} bytes)", path.display(), bytes.len());
                }
                None => println!("{}", sanitize::to_data_uri(&bytes)),
            }
        }

        Commands::Config { set_parts_path, set_mouser_key, remove, show } => {
            if let Some(path) = set_parts_path {
                let normalized = path.replace('\\', "/");
                settings.set(config::PARTS_PATH_KEY, &normalized)?;
                println!("✔ ベースパスを設定しました: {}", normalized);
            }

            if let Some(key) = set_mouser_key {
                settings.set(config::MOUSER_API_KEY, &key)?;
                println!("✔ Mouser APIキーを設定しました");
            }

            if let Some(key) = remove {
                if settings.remove(&key)? {
                    println!("✔ {} を削除しました", key);
                } else {
                    println!("{} は設定されていません", key);
                }
            }

            if show {
                println!("設定: {}", settings.path().display());
                for (key, value) in settings.all() {
                    let shown = if key == config::MOUSER_API_KEY { "設定済み".to_string() } else { value };
                    println!("  {}: {}", key, shown);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn base_path(flag: Option<&str>, settings: &SettingsStore) -> String {
    flag.map(str::to_string)
        .or_else(|| settings.parts_path())
        .unwrap_or_default()
}

fn table_path(flag: Option<&str>, settings: &SettingsStore, category: &str) -> Result<PathBuf> {
    let base = base_path(flag, settings);
    let root = tree::database_root(&base).ok_or_else(|| {
        CatalogError::Config("部品データベースのパスが未設定です".into())
    })?;
    tree::resolve_table_path(&root, category)
}

/// `--set` の値をヘッダーへ割り当てる（該当なしは警告して無視）
fn apply_assignments(aliases: &AliasTable, headers: &[String], record: &mut PartRecord, fields: &[FieldAssignment]) {
    for field in fields {
        match aliases.match_header(headers, &field.key) {
            Some(header) => {
                record.insert(header.to_string(), field.value.clone());
            }
            None => eprintln!("警告: ヘッダーにない項目を無視します: {}", field.key),
        }
    }
}

fn print_tree(nodes: &[CategoryNode], depth: usize) {
    for node in nodes {
        let marker = if node.is_leaf() { "-" } else { "+" };
        println!("{}{} {}", "  ".repeat(depth), marker, node.name);
        print_tree(&node.children, depth + 1);
    }
}

fn print_table(table: &CatalogTable) {
    let headers = table.headers();
    let widths: Vec<usize> = headers
        .iter()
        .map(|h| {
            table
                .rows()
                .iter()
                .filter_map(|r| r.get(h))
                .map(|v| v.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", render(headers.iter().map(String::as_str).collect()));
    println!("{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    for row in table.rows() {
        println!(
            "{}",
            render(headers.iter().map(|h| row.get(h).map(String::as_str).unwrap_or_default()).collect())
        );
    }
    println!("({}件)", table.rows().len());
}
