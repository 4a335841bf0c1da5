//! dstore Todos
//!
//! A controller for records whose payload is an ordered list of strings.
//! Views call [`ListController::add_item`] and
//! [`ListController::remove_item_at`] and render from
//! [`ListController::state`]; the read-merge-write stays in here.
//!
//! # Example
//!
//! ```rust,ignore
//! use dstore_cache::CacheManager;
//! use dstore_core::{MemoryStore, StoreConfig};
//! use dstore_todos::TodosController;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(StoreConfig::default());
//! let todos = TodosController::todos(MemoryStore::new(), &cache);
//!
//! todos.add_item("buy milk").await?;
//! todos.add_item("walk dog").await?;
//! todos.remove_item_at(0).await?;
//! assert_eq!(todos.items().await?, vec!["walk dog"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod controller;
mod record;

pub use controller::{ControllerState, ListController, Mutation, TodosController};
pub use record::{ListRecord, TodosRecord};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
