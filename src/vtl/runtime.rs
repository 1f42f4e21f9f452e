//! Runtime
//!
//!     Everything that happens after parsing: [value]s and the [host] object interface,
//!     built-in members of plain data ([builtins]), [operators], the [scope] manager, foreach
//!     [iteration], the [loader] collaborator, the caller's [context] and the [evaluator]
//!     that ties them together.

pub mod builtins;
pub mod context;
pub mod evaluator;
pub mod host;
pub mod iteration;
pub mod loader;
pub mod operators;
pub mod scope;
pub mod value;

pub use context::{Context, Providers};
pub use evaluator::{Evaluator, Flow};
pub use host::{FnObject, HostObject};
pub use loader::{LoaderError, NoLoader, ResourceLoader};
pub use scope::{MacroTable, ScopeError, ScopeStack};
pub use value::Value;
