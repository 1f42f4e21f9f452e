//! # vtl
//!
//! A Velocity Template Language engine: lexer, parser, space gobbling and an async
//! tree-walking evaluator.
//!
//! ```rust,ignore
//! use vtl::{render, Context, RenderOptions};
//!
//! let context = Context::new().with("name", "world");
//! let output = render("Hello $name!", &context, &RenderOptions::default())?;
//! assert_eq!(output, "Hello world!");
//! ```
//!
//! Everything lives under [vtl]; the most used items are re-exported here.

pub mod vtl;

pub use vtl::config::RenderOptions;
pub use vtl::engine::{compile, render, render_async, render_with_loader, Template};
pub use vtl::error::Error;
pub use vtl::gobbling::SpaceGobbling;
pub use vtl::runtime::{Context, FnObject, HostObject, LoaderError, NoLoader, ResourceLoader, Value};
