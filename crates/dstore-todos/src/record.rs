//! List-shaped records
//!
//! A [`ListRecord`] carries an ordered list of strings plus whatever other
//! fields the document happens to hold. Rebuilding with a new list keeps
//! those other fields untouched.

use dstore_core::RecordAddress;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record whose payload is an ordered sequence of strings
pub trait ListRecord: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    /// Current items in order
    fn items(&self) -> &[String];

    /// Same record with `items` in place of the current list
    #[must_use]
    fn with_items(&self, items: Vec<String>) -> Self;
}

/// `{ "todos": [...] }` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TodosRecord {
    /// Todo entries in insertion order
    pub todos: Vec<String>,
    /// Any other fields stored alongside the list
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TodosRecord {
    /// Namespace of the demo record
    pub const NAMESPACE: &'static str = "maintenance";
    /// Key of the demo record
    pub const KEY: &'static str = "todos";

    /// Record holding only `todos`
    #[must_use]
    pub fn new<I, T>(todos: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            todos: todos.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }

    /// `maintenance/todos`
    #[must_use]
    pub fn address() -> RecordAddress {
        RecordAddress::new(Self::NAMESPACE, Self::KEY)
            .unwrap_or_else(|_| unreachable!("constant address segments are valid"))
    }
}

impl ListRecord for TodosRecord {
    fn items(&self) -> &[String] {
        &self.todos
    }

    fn with_items(&self, items: Vec<String>) -> Self {
        Self {
            todos: items,
            extra: self.extra.clone(),
        }
    }
}
