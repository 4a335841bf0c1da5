//! dstore Schema Layer
//!
//! Strict decoding at the boundary: untyped data from the store is either
//! turned into a typed value or reported as a [`SchemaError`](dstore_core::SchemaError).
//! Nothing untyped travels past [`ValidatedAccessor`].
//!
//! # Validators
//!
//! - [`SerdeSchema`]: decode with serde, fail on the first mismatch
//! - [`JsonSchemaValidator`]: check a JSON Schema (explicit or derived with
//!   `schemars`), report every violation, then decode
//! - any `Fn(&Value) -> Result<T, SchemaError>`
//!
//! # Example
//!
//! ```rust,ignore
//! use dstore_schema::{JsonSchemaValidator, ValidatedAccessor};
//!
//! # async fn example(cached: dstore_cache::CachedAccessor<dstore_core::MemoryStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let todos = ValidatedAccessor::new(cached, JsonSchemaValidator::<TodosRecord>::for_type()?);
//! let record: Option<TodosRecord> = todos.read(&address).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod accessor;
mod validate;

pub use accessor::ValidatedAccessor;
pub use validate::{JsonSchemaValidator, SerdeSchema, Validate};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
