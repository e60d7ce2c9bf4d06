//! # memocache
//!
//! Memoizing call wrapper with a bounded result cache.
//!
//! ## Architecture
//! - **Key**: binds positional/keyword arguments to a declared signature
//! - **FIFO store**: AHash map + slab linked list, oldest insert evicted first
//! - **Stats**: atomic hit/miss/eviction counters
//! - **Memoized**: wraps a computation, lock released while it runs
//!
//! ```
//! use memocache::{memoize, CacheKey, CallArgs, MemoizedFn, Param, Signature, Value};
//! use std::convert::Infallible;
//!
//! let square = memoize("square", 2, |x: &i64| Ok::<_, Infallible>(x * x));
//! assert_eq!(square.call(&3), Ok(9));
//! assert_eq!(square.call(&3), Ok(9));
//! assert_eq!(square.stats().hits, 1);
//!
//! let sig = Signature::new("add", [Param::required("a"), Param::with_default("b", 10)]).unwrap();
//! let add = MemoizedFn::new(sig, 128, |args: &CacheKey| {
//!     let a = args.get("a").and_then(Value::as_int).unwrap_or(0);
//!     let b = args.get("b").and_then(Value::as_int).unwrap_or(0);
//!     Ok::<_, Infallible>(a + b)
//! });
//! add.call(&CallArgs::new().arg(5)).unwrap();
//! add.call(&CallArgs::new().kwarg("a", 5).kwarg("b", 10)).unwrap();
//! assert_eq!(add.stats().misses, 1);
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod fifo;
mod key;
mod stats;

pub use cache::{memoize, Memoized, MemoizedFn, Recurse};
pub use config::{CacheConfig, DEFAULT_CAPACITY};
pub use error::{BindingError, CallError, Error, Result};
pub use fifo::{FifoStore, Keys};
pub use key::{CacheKey, CallArgs, Param, Signature, Value};
pub use stats::{CacheStats, StatsSnapshot};
