use crate::Commands;
use cxnet::backend::{ImportCallback, LocalBackend, RemoteBackend, SiteBackend, StoredRecord};
use cxnet::config::{self, BackendKind, Settings};
use cxnet::output::{emit_success, OutputMode};
use cxnet::storage::{LeanCloudClient, LocalStore, RemoteStore};
use cxnet::ui::{self, Icons};
use cxnet::{board, image, Collection, SiteData};
use owo_colors::OwoColorize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fields that hold numbers rather than text
const NUMERIC_FIELDS: &[&str] = &["likes", "order"];

/// Open the backend selected by the settings
pub fn open_backend(settings: &Settings) -> anyhow::Result<Arc<dyn SiteBackend>> {
    match settings.backend {
        BackendKind::Local => {
            config::ensure_db_dir(&settings.database)?;
            let store = LocalStore::open(&settings.database)?;
            tracing::debug!("Opened local store at {}", settings.database.display());
            Ok(Arc::new(LocalBackend::new(store)))
        }
        BackendKind::Remote => {
            let remote = settings.require_remote()?;
            let client = LeanCloudClient::new(remote)?;
            tracing::debug!("Using remote store at {}", client.base_url());
            Ok(Arc::new(RemoteBackend::new(RemoteStore::new(client))))
        }
    }
}

/// Columns shown by `list` for each collection
fn columns(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Resources | Collection::Events => &["title", "desc", "img", "link"],
        Collection::Coding => &["name", "link"],
        Collection::Messages => &["name", "content", "time", "likes"],
    }
}

/// Parse `FIELD=VALUE` assignments into a field map
pub fn parse_assignments(assignments: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut fields = Map::new();
    for assignment in assignments {
        let Some((key, value)) = assignment.split_once('=') else {
            anyhow::bail!("expected FIELD=VALUE, got `{}`", assignment);
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("empty field name in `{}`", assignment);
        }

        let value = if NUMERIC_FIELDS.contains(&key) {
            let number: i64 = value
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("field `{}` expects a number, got `{}`", key, value))?;
            Value::from(number)
        } else {
            Value::from(value)
        };
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

fn with_image(mut fields: Map<String, Value>, img_file: Option<&Path>) -> anyhow::Result<Map<String, Value>> {
    if let Some(path) = img_file {
        fields.insert("img".to_string(), Value::from(image::image_data_url(path)?));
    }
    Ok(fields)
}

fn records_json(records: &[StoredRecord]) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(records)?)
}

fn print_records(collection: Collection, records: &[StoredRecord]) {
    if records.is_empty() {
        println!("{} No {} yet.", Icons::EMPTY, collection);
    } else {
        println!("{}", ui::record_table(records, columns(collection)));
    }
}

pub async fn run(
    command: Commands,
    settings: &Settings,
    config_path: Option<&Path>,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => run_init(config_path, force, output_mode),
        Commands::Version => run_version(output_mode),
        Commands::Serve { port, static_dir } => {
            let backend = open_backend(settings)?;
            let static_dir = static_dir.unwrap_or_else(|| settings.static_dir.clone());
            cxnet::server::start_server(port, backend, static_dir).await
        }
        command => {
            let backend = open_backend(settings)?;
            run_with_backend(command, backend.as_ref(), output_mode).await
        }
    }
}

pub fn run_init(config_path: Option<&Path>, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let starter = config::starter_config();
    config::write_config(&path, &starter, force)?;

    let project_root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config::ensure_gitignore(&project_root)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::info("Backend", "local");
        ui::info("Database", starter.database.as_deref().unwrap_or_default());
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "config": path }))?;
    }
    Ok(())
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        ui::banner(
            &format!("{}", "cxnet".style(ui::theme().header.clone())),
            &format!("Version {}", env!("CARGO_PKG_VERSION").bold()),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

async fn run_with_backend(
    command: Commands,
    backend: &dyn SiteBackend,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Stats => {
            let mut counts = Vec::new();
            for collection in Collection::all() {
                counts.push((*collection, backend.list(*collection).await?.len()));
            }

            if output_mode.is_human() {
                let backend_icon = if backend.name() == "remote" { Icons::CLOUD } else { Icons::DATABASE };
                println!("{} Site statistics ({} {} backend)", Icons::STATS, backend_icon, backend.name());
                let rows: Vec<(String, String)> = counts
                    .iter()
                    .map(|(c, n)| (c.to_string(), n.to_string()))
                    .collect();
                let rows: Vec<(&str, &str)> = rows.iter().map(|(c, n)| (c.as_str(), n.as_str())).collect();
                println!("{}", ui::stats_table(&rows));
            } else {
                let data: Map<String, Value> = counts
                    .into_iter()
                    .map(|(c, n)| (c.to_string(), Value::from(n)))
                    .collect();
                emit_success(output_mode, "stats", Value::Object(data))?;
            }
        }

        Commands::List { collection } => {
            let collection: Collection = collection.parse()?;
            let records = backend.list(collection).await?;
            if output_mode.is_human() {
                ui::section(&format!("{} ({})", collection, records.len()));
                print_records(collection, &records);
            } else {
                emit_success(output_mode, "list", records_json(&records)?)?;
            }
        }

        Commands::Add { collection, set, img_file } => {
            let collection: Collection = collection.parse()?;
            let fields = with_image(parse_assignments(&set)?, img_file.as_deref())?;
            let id = if collection == Collection::Messages {
                let text = |key: &str| fields.get(key).and_then(Value::as_str).unwrap_or_default();
                board::post_message(backend, text("name"), text("content")).await?
            } else {
                backend.save(collection, fields, None).await?
            };
            let records = backend.list(collection).await?;

            if output_mode.is_human() {
                println!("{} Added {} record {}", Icons::NEW, collection, id.style(ui::theme().key.clone()));
                print_records(collection, &records);
            } else {
                emit_success(output_mode, "add", serde_json::json!({ "id": id, "records": records_json(&records)? }))?;
            }
        }

        Commands::Edit { collection, id, set, img_file } => {
            let collection: Collection = collection.parse()?;
            let existing = backend
                .list(collection)
                .await?
                .into_iter()
                .find(|record| record.id == id)
                .ok_or_else(|| anyhow::anyhow!("no {} record with id {}", collection, id))?;

            let mut fields = existing.fields;
            fields.extend(with_image(parse_assignments(&set)?, img_file.as_deref())?);
            backend.save(collection, fields, Some(id.as_str())).await?;
            let records = backend.list(collection).await?;

            if output_mode.is_human() {
                println!("{} Updated {} record {}", Icons::MOD, collection, id.style(ui::theme().key.clone()));
                print_records(collection, &records);
            } else {
                emit_success(output_mode, "edit", serde_json::json!({ "id": id, "records": records_json(&records)? }))?;
            }
        }

        Commands::Remove { collection, id } => {
            let collection: Collection = collection.parse()?;
            backend.delete(collection, &id).await?;
            let records = backend.list(collection).await?;

            if output_mode.is_human() {
                println!("{} Removed {} record {}", Icons::DEL, collection, id.style(ui::theme().key.clone()));
                print_records(collection, &records);
            } else {
                emit_success(output_mode, "remove", serde_json::json!({ "id": id, "records": records_json(&records)? }))?;
            }
        }

        Commands::Post { name, content } => {
            let id = board::post_message(backend, &name, &content).await?;
            let records = backend.list(Collection::Messages).await?;

            if output_mode.is_human() {
                println!("{} Posted message {}", Icons::MESSAGE, id.style(ui::theme().key.clone()));
                print_records(Collection::Messages, &records);
            } else {
                emit_success(output_mode, "post", serde_json::json!({ "id": id, "records": records_json(&records)? }))?;
            }
        }

        Commands::Like { id } => {
            let likes = board::like_message(backend, &id).await?;
            if output_mode.is_human() {
                println!("{} Message {} now has {} likes", Icons::LIKE, id.style(ui::theme().key.clone()), likes);
            } else {
                emit_success(output_mode, "like", serde_json::json!({ "id": id, "likes": likes }))?;
            }
        }

        Commands::Export { out } => {
            let path = backend.export_file(&out).await?;

            if output_mode.is_human() {
                ui::success(&format!("{} Exported site data to {}", Icons::EXPORT, path.display()));
            } else {
                emit_success(output_mode, "export", serde_json::json!({ "path": path }))?;
            }
        }

        Commands::Import { file } => {
            let human = output_mode.is_human();
            let label = file.display().to_string();
            let announce: ImportCallback = Box::new(move |data: &SiteData| {
                if human {
                    ui::success(&format!("{} Imported {}", Icons::IMPORT, label));
                    for (collection, count) in data.counts() {
                        ui::summary_row(collection.as_str(), &count.to_string());
                    }
                }
            });
            let data = backend.import_file(&file, announce).await?;

            if !human {
                emit_success(output_mode, "import", serde_json::to_value(&data)?)?;
            }
        }

        Commands::Reset => {
            let data = backend.reset().await?;
            if output_mode.is_human() {
                ui::success("Restored the default dataset");
            } else {
                emit_success(output_mode, "reset", serde_json::to_value(&data)?)?;
            }
        }

        Commands::Init { .. } | Commands::Version | Commands::Serve { .. } => {
            anyhow::bail!("`{}` does not operate on the site data", command.name());
        }
    }

    Ok(())
}
