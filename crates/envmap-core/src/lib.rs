//! envmap-core: Environment variable map with recursive resolution
//!
//! This crate holds a set of named raw values that may reference each other,
//! or variables of the host environment, through `${env:NAME}` placeholders,
//! and resolves them lazily with memoization and cycle detection.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use envmap_core::{EnvironmentVariableMap, StaticEnvironment};
//!
//! let host = StaticEnvironment::new().with_var("HOME", "/home/me");
//! let mut map = EnvironmentVariableMap::with_lookup(Arc::new(host));
//! map.load_raw([
//!     ("APP_HOME", "${env:HOME}/app"),
//!     ("APP_BIN", "${env:APP_HOME}/bin"),
//! ]);
//!
//! assert_eq!(map.resolve("APP_BIN").unwrap(), "/home/me/app/bin");
//! assert_eq!(map.get_raw("APP_BIN"), Some("${env:APP_HOME}/bin"));
//! ```

pub mod environment;
pub mod error;
pub mod interpolation;

mod document;
mod map;

pub use document::Format;
pub use environment::{EnvironmentLookup, FnLookup, ProcessEnvironment, StaticEnvironment};
pub use error::{CycleError, Error, ErrorKind, Result};
pub use map::{EnvironmentVariableMap, InvalidationPolicy, MapOptions};
