//! Memoizing call wrappers
//!
//! [`Memoized`] caches a computation over a typed key. [`MemoizedFn`]
//! layers signature binding on top so calls can mix positional and
//! keyword arguments and still share entries.

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::{CallError, Result};
use crate::fifo::FifoStore;
use crate::key::{CacheKey, CallArgs, Signature};
use crate::stats::{CacheStats, StatsSnapshot};

/// Handle a recursive computation uses to re-enter its own cache
pub type Recurse<'a, K, V, E> = &'a dyn Fn(&K) -> std::result::Result<V, E>;

type Compute<K, V, E> =
    dyn Fn(Recurse<'_, K, V, E>, &K) -> std::result::Result<V, E> + Send + Sync;

/// A computation wrapped with a bounded FIFO result cache
pub struct Memoized<K, V, E> {
    /// Name used in logs
    name: String,

    /// Cached results, oldest first
    store: Mutex<FifoStore<K, V>>,

    /// Cache statistics
    stats: CacheStats,

    /// The wrapped computation
    func: Box<Compute<K, V, E>>,
}

impl<K, V, E> Memoized<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Wrap a computation
    ///
    /// # Arguments
    /// * `config` - Name and capacity
    /// * `f` - Pure computation; same key must give the same result
    pub fn new<F>(config: CacheConfig, f: F) -> Self
    where
        F: Fn(&K) -> std::result::Result<V, E> + Send + Sync + 'static,
    {
        Self::recursive(config, move |_, key| f(key))
    }

    /// Wrap a computation that calls itself through the cache
    ///
    /// The first argument handed to `f` re-enters this wrapper, so
    /// sub-results are looked up and stored like any other call.
    pub fn recursive<F>(config: CacheConfig, f: F) -> Self
    where
        F: Fn(Recurse<'_, K, V, E>, &K) -> std::result::Result<V, E> + Send + Sync + 'static,
    {
        Self {
            name: config.name,
            store: Mutex::new(FifoStore::new(config.capacity)),
            stats: CacheStats::new(),
            func: Box::new(f),
        }
    }

    /// Return the cached result for `key`, computing and storing it on a miss
    ///
    /// Errors from the computation are returned as-is and nothing is
    /// stored for the key.
    pub fn call(&self, key: &K) -> std::result::Result<V, E> {
        // Lock is released before the computation runs
        let cached = self.store.lock().get(key).cloned();
        if let Some(value) = cached {
            self.stats.record_hit();
            debug!(function = %self.name, "cache hit");
            return Ok(value);
        }

        self.stats.record_miss();
        debug!(function = %self.name, "cache miss");

        let recurse: Recurse<'_, K, V, E> = &|k: &K| self.call(k);
        let value = (self.func)(recurse, key)?;

        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    fn insert(&self, key: K, value: V) {
        let mut store = self.store.lock();
        if store.capacity() == 0 {
            return;
        }
        let evicted = store.put(key, value);
        drop(store);

        self.stats.record_insert();
        if evicted.is_some() {
            self.stats.record_eviction();
            trace!(function = %self.name, "evicted oldest entry");
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current statistics
    pub fn stats(&self) -> StatsSnapshot {
        let store = self.store.lock();
        self.stats.snapshot(store.len(), store.capacity())
    }

    /// Empty the cache and reset statistics
    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.clear();
        self.stats.reset();
        debug!(function = %self.name, "cache cleared");
    }

    /// Drop one cached result; returns whether it was present
    pub fn invalidate(&self, key: &K) -> bool {
        self.store.lock().remove(key).is_some()
    }

    /// Check whether a result is cached for `key`
    pub fn contains(&self, key: &K) -> bool {
        self.store.lock().contains(key)
    }

    /// Cached keys, oldest first
    pub fn keys(&self) -> Vec<K> {
        self.store.lock().keys().cloned().collect()
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Maximum number of cached results
    pub fn capacity(&self) -> usize {
        self.store.lock().capacity()
    }
}

impl<K, V, E> fmt::Debug for Memoized<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Wrap a computation with a cache of `capacity` entries
pub fn memoize<K, V, E, F>(name: impl Into<String>, capacity: usize, f: F) -> Memoized<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    F: Fn(&K) -> std::result::Result<V, E> + Send + Sync + 'static,
{
    Memoized::new(CacheConfig::named(name).with_capacity(capacity), f)
}

/// A memoized computation called with positional and keyword arguments
///
/// Arguments are bound against the declared [`Signature`]; the resulting
/// [`CacheKey`] is both the cache key and what the computation reads its
/// inputs from.
pub struct MemoizedFn<V, E> {
    signature: Signature,
    inner: Memoized<CacheKey, V, E>,
}

impl<V, E> MemoizedFn<V, E>
where
    V: Clone,
{
    /// Wrap a computation declared by `signature`
    pub fn new<F>(signature: Signature, capacity: usize, f: F) -> Self
    where
        F: Fn(&CacheKey) -> std::result::Result<V, E> + Send + Sync + 'static,
    {
        let config = CacheConfig::named(signature.function()).with_capacity(capacity);
        Self {
            signature,
            inner: Memoized::new(config, f),
        }
    }

    /// Call with the given arguments
    ///
    /// # Errors
    /// * `CallError::Key` - arguments do not bind, or a value is unhashable
    /// * `CallError::Computation` - the computation failed
    pub fn call(&self, args: &CallArgs) -> std::result::Result<V, CallError<E>> {
        let key = self.signature.bind(args)?;
        self.inner.call(&key).map_err(CallError::Computation)
    }

    /// Declared signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Function name
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Current statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats()
    }

    /// Empty the cache and reset statistics
    pub fn clear(&self) {
        self.inner.clear()
    }

    /// Drop the result cached for these arguments
    pub fn invalidate(&self, args: &CallArgs) -> Result<bool> {
        let key = self.signature.bind(args)?;
        Ok(self.inner.invalidate(&key))
    }

    /// Check whether a result is cached for these arguments
    pub fn contains(&self, args: &CallArgs) -> Result<bool> {
        let key = self.signature.bind(args)?;
        Ok(self.inner.contains(&key))
    }

    /// Cached keys, oldest first
    pub fn keys(&self) -> Vec<CacheKey> {
        self.inner.keys()
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of cached results
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl<V: Clone, E> fmt::Debug for MemoizedFn<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedFn")
            .field("signature", &self.signature)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BindingError, Error};
    use crate::key::{Param, Value};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted_square(capacity: usize) -> (Memoized<i64, i64, Infallible>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let square = memoize("square", capacity, move |x: &i64| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(x * x)
        });
        (square, calls)
    }

    #[test]
    fn test_cache_hit() {
        let (square, calls) = counted_square(10);

        assert_eq!(square.call(&2), Ok(4));
        assert_eq!(square.call(&2), Ok(4));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = square.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total, 2);
    }

    #[test]
    fn test_cache_square_walkthrough() {
        let (square, calls) = counted_square(2);

        assert_eq!(square.call(&2), Ok(4)); // miss
        assert_eq!(square.call(&2), Ok(4)); // hit
        assert_eq!(square.stats().misses, 1);
        assert_eq!(square.call(&3), Ok(9)); // miss
        assert_eq!(square.call(&4), Ok(16)); // miss, evicts 2

        assert_eq!(square.keys(), vec![3, 4]);
        assert!(!square.contains(&2));

        assert_eq!(square.call(&2), Ok(4)); // miss again
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let stats = square.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 4);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.size, 2);
    }

    #[test]
    fn test_cache_eviction_is_fifo() {
        let (square, _) = counted_square(3);

        for x in 0..3 {
            square.call(&x).unwrap();
        }
        // Hits do not refresh 0
        square.call(&0).unwrap();
        square.call(&3).unwrap();

        assert_eq!(square.keys(), vec![1, 2, 3]);
        assert_eq!(square.len(), 3);
    }

    #[test]
    fn test_cache_error_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let checked = memoize("sqrt", 10, move |x: &i64| {
            counter.fetch_add(1, Ordering::SeqCst);
            if *x < 0 {
                Err(format!("negative input {}", x))
            } else {
                Ok((*x as f64).sqrt() as i64)
            }
        });

        assert_eq!(checked.call(&-1), Err("negative input -1".to_string()));
        assert!(checked.is_empty());
        assert_eq!(checked.call(&-1), Err("negative input -1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = checked.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.inserts, 0);

        assert_eq!(checked.call(&16), Ok(4));
        assert_eq!(checked.len(), 1);
    }

    #[test]
    fn test_cache_zero_capacity() {
        let (square, calls) = counted_square(0);

        square.call(&2).unwrap();
        square.call(&2).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = square.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_cache_clear() {
        let (square, calls) = counted_square(10);

        square.call(&2).unwrap();
        square.call(&2).unwrap();
        square.clear();

        let stats = square.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 0);

        square.call(&2).unwrap();
        assert_eq!(square.stats().misses, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_invalidate() {
        let (square, calls) = counted_square(10);

        square.call(&5).unwrap();
        assert!(square.invalidate(&5));
        assert!(!square.invalidate(&5));

        square.call(&5).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_recursive_fibonacci() {
        let fib: Memoized<u64, u64, Infallible> = Memoized::recursive(
            CacheConfig::named("fibonacci").with_capacity(10),
            |fib, n| {
                if *n <= 1 {
                    return Ok(*n);
                }
                Ok(fib(&(n - 1))? + fib(&(n - 2))?)
            },
        );

        assert_eq!(fib.call(&10), Ok(55));

        let stats = fib.stats();
        assert_eq!(stats.misses, 11);
        assert_eq!(stats.hits, 8);
        assert_eq!(stats.size, 10);
        assert_eq!(stats.evictions, 1);
        // fibonacci(1) was stored first
        assert!(!fib.contains(&1));
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let (square, calls) = counted_square(64);
        let square = Arc::new(square);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let square = Arc::clone(&square);
                std::thread::spawn(move || {
                    for x in 0..32 {
                        assert_eq!(square.call(&x), Ok(x * x));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = square.stats();
        assert_eq!(stats.total, 128);
        assert_eq!(stats.size, 32);
        assert!(calls.load(Ordering::SeqCst) >= 32);
    }

    fn add_fn() -> (MemoizedFn<i64, Infallible>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sig = Signature::new("add", [Param::required("a"), Param::with_default("b", 10)])
            .unwrap();
        let add = MemoizedFn::new(sig, 128, move |args: &CacheKey| {
            counter.fetch_add(1, Ordering::SeqCst);
            let a = args.get("a").and_then(Value::as_int).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_int).unwrap_or(0);
            Ok(a + b)
        });
        (add, calls)
    }

    #[test]
    fn test_fn_keyword_variants_share_entry() {
        let (add, calls) = add_fn();

        assert_eq!(add.call(&CallArgs::new().arg(5)).unwrap(), 15);
        assert_eq!(add.call(&CallArgs::new().arg(5).kwarg("b", 10)).unwrap(), 15);
        assert_eq!(add.call(&CallArgs::new().kwarg("a", 5).kwarg("b", 10)).unwrap(), 15);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(add.len(), 1);
        let stats = add.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_fn_numeric_arguments_share_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sig = Signature::new("square", [Param::required("x")]).unwrap();
        let square = MemoizedFn::new(sig, 128, move |args: &CacheKey| {
            counter.fetch_add(1, Ordering::SeqCst);
            let x = args.get("x").and_then(Value::as_float).unwrap_or(0.0);
            Ok::<_, Infallible>(x * x)
        });

        assert_eq!(square.call(&CallArgs::new().arg(2)).unwrap(), 4.0);
        assert_eq!(square.call(&CallArgs::new().arg(2.0)).unwrap(), 4.0);
        // true is 1, so it reads the entry stored for 1
        assert_eq!(square.call(&CallArgs::new().arg(1)).unwrap(), 1.0);
        assert_eq!(square.call(&CallArgs::new().arg(true)).unwrap(), 1.0);

        let stats = square.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fn_binding_error_not_counted() {
        let (add, calls) = add_fn();

        let err = add.call(&CallArgs::new()).unwrap_err();
        assert!(matches!(
            err,
            CallError::Key(Error::Binding(BindingError::MissingArguments { .. }))
        ));

        let err = add
            .call(&CallArgs::new().arg(Value::List(vec![])))
            .unwrap_err();
        assert!(matches!(err, CallError::Key(Error::UnhashableArgument { .. })));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(add.stats().total, 0);
        assert!(add.is_empty());
    }

    #[test]
    fn test_fn_computation_error_passthrough() {
        let sig = Signature::new("div", [Param::required("a"), Param::required("b")]).unwrap();
        let div = MemoizedFn::new(sig, 8, |args: &CacheKey| {
            let a = args.get("a").and_then(Value::as_int).unwrap_or(0);
            match args.get("b").and_then(Value::as_int) {
                Some(0) | None => Err("division by zero"),
                Some(b) => Ok(a / b),
            }
        });

        let err = div.call(&CallArgs::new().arg(1).arg(0)).unwrap_err();
        assert_eq!(err.into_computation(), Some("division by zero"));
        assert!(div.is_empty());

        assert_eq!(div.call(&CallArgs::new().arg(9).arg(3)).unwrap(), 3);
        assert!(div.contains(&CallArgs::new().kwarg("b", 3).kwarg("a", 9)).unwrap());
        assert!(div.invalidate(&CallArgs::new().arg(9).arg(3)).unwrap());
        assert!(div.is_empty());
    }
}
