//! Command execution against a `FileStore`

use anyhow::Context;
use dstore_cache::{CacheManager, CachedAccessor};
use dstore_core::{FileStore, RecordAddress, StoreConfig};
use dstore_schema::{SerdeSchema, ValidatedAccessor};
use dstore_todos::{ListController, Mutation, TodosRecord};
use std::path::PathBuf;

/// Where the record lives and how to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Options {
    pub(crate) config: Option<PathBuf>,
    pub(crate) root: PathBuf,
    pub(crate) namespace: String,
    pub(crate) key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    List,
    Add(String),
    Remove(usize),
    Show,
}

type Controller = ListController<TodosRecord, FileStore>;

fn controller(options: &Options) -> anyhow::Result<Controller> {
    let config = match &options.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let address = RecordAddress::new(options.namespace.as_str(), options.key.as_str())
        .context("invalid record address")?;

    let cache = CacheManager::new(config);
    let cached = CachedAccessor::new(FileStore::new(&options.root), &cache);
    Ok(ListController::new(
        address,
        ValidatedAccessor::new(cached, SerdeSchema::new()),
    ))
}

fn render_items(items: &[String]) -> String {
    if items.is_empty() {
        return "(empty)".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{i}: {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run `action` and return what should be printed
pub(crate) async fn execute(options: &Options, action: Action) -> anyhow::Result<String> {
    let list = controller(options)?;
    let address = list.address().clone();
    tracing::debug!(%address, ?action, "executing");

    let output = match action {
        Action::List => render_items(&list.items().await?),
        Action::Show => {
            let raw = list.accessor().cached().read(&address).await?;
            match raw {
                Some(value) => serde_json::to_string_pretty(&value)?,
                None => format!("no record at {address}"),
            }
        }
        Action::Add(value) => match list.add_item(value.as_str()).await? {
            Mutation::Written(record) => {
                format!("added \"{value}\" ({} items)", record.todos.len())
            }
            Mutation::Skipped => "nothing to add".to_string(),
        },
        Action::Remove(index) => match list.remove_item_at(index).await? {
            Mutation::Written(record) => {
                format!("removed item {index} ({} items)", record.todos.len())
            }
            Mutation::Skipped => "nothing removed".to_string(),
        },
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options(root: &std::path::Path) -> Options {
        Options {
            config: None,
            root: root.to_path_buf(),
            namespace: TodosRecord::NAMESPACE.to_string(),
            key: TodosRecord::KEY.to_string(),
        }
    }

    #[tokio::test]
    async fn add_list_remove_round() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());

        assert_eq!(execute(&opts, Action::List).await.unwrap(), "(empty)");
        assert_eq!(
            execute(&opts, Action::Add("buy milk".into())).await.unwrap(),
            "added \"buy milk\" (1 items)"
        );
        execute(&opts, Action::Add("walk dog".into())).await.unwrap();
        assert_eq!(
            execute(&opts, Action::List).await.unwrap(),
            "0: buy milk\n1: walk dog"
        );

        execute(&opts, Action::Remove(0)).await.unwrap();
        assert_eq!(execute(&opts, Action::List).await.unwrap(), "0: walk dog");
        assert!(dir.path().join("maintenance").join("todos.json").exists());
    }

    #[tokio::test]
    async fn empty_add_reports_nothing_to_add() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());

        let out = execute(&opts, Action::Add(String::new())).await.unwrap();

        assert_eq!(out, "nothing to add");
        assert!(!dir.path().join("maintenance").exists());
    }

    #[tokio::test]
    async fn out_of_range_remove_fails() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        execute(&opts, Action::Add("only".into())).await.unwrap();

        let err = execute(&opts, Action::Remove(5)).await.unwrap_err();

        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn show_prints_missing_record() {
        let dir = tempfile::tempdir().unwrap();

        let out = execute(&options(dir.path()), Action::Show).await.unwrap();

        assert_eq!(out, "no record at maintenance/todos");
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.key = "a/b".to_string();

        assert!(execute(&opts, Action::List).await.is_err());
    }

    #[tokio::test]
    async fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("dstore.toml");
        std::fs::write(&config, "write_policy = \"last_write_wins\"\n").unwrap();
        let mut opts = options(dir.path());
        opts.config = Some(config.clone());

        execute(&opts, Action::Add("a".into())).await.unwrap();

        opts.config = Some(dir.path().join("missing.toml"));
        let err = execute(&opts, Action::List).await.unwrap_err();
        assert!(err.to_string().contains("loading config"));
    }
}
