#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Quick Start
//!
//! ```rust
//! use lockless_cache::{LocklessCache, PutOutcome};
//! use lockless_cache::config::{LocklessCacheConfig, Placement};
//! use core::num::NonZeroUsize;
//!
//! let config = LocklessCacheConfig {
//!     capacity: NonZeroUsize::new(16).unwrap(),
//!     line_size: 64,
//!     placement: Placement::Aligned,
//! };
//! let cache: LocklessCache = LocklessCache::init(config, None);
//!
//! // Sixteen payloads fill the single neighborhood...
//! for payload in 1..=16 {
//!     assert_eq!(cache.put_with_hash(payload, 16), PutOutcome::InsertedEmpty);
//! }
//! // ...so the seventeenth trades places with the home slot's occupant.
//! assert_eq!(cache.put_with_hash(17, 16), PutOutcome::InsertedEvicted(1));
//! assert_eq!(cache.put_with_hash(17, 16), PutOutcome::Found);
//! ```
//!
//! ## Memory Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                  LocklessCache (capacity slots)                    │
//! │                                                                    │
//! │  ┌──────────────┐ ┌──────────────┐     ┌──────────────┐            │
//! │  │   line 0     │ │   line 1     │ ... │  line N-1    │            │
//! │  │ 16 × u32     │ │ 16 × u32     │     │ 16 × u32     │            │
//! │  └──────────────┘ └──────────────┘     └──────────────┘            │
//! │         ▲                ▲                    ▲                    │
//! │         │                │                    │                    │
//! │   hash(p1) & mask  hash(p2) & mask      hash(pN) & mask            │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There are no locks anywhere: every slot update is a single atomic
//! compare-and-swap, and a probe never leaves the cache line its hash selects.
//!
//! ## Cargo Features
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `hashbrown` | yes | `hashbrown`'s default hasher derives payload hashes |
//! | `stats` | no | Relaxed atomic counters and [`metrics::CacheMetrics`] |
//! | `std` | no | Links `std`; required when `hashbrown` is disabled |
//! | `numa` | no | [`config::Placement::Interleaved`] via `mbind` on Linux |
//!
//! ## Modules
//!
//! - [`cache`]: The lock-free cache and its put/clear protocol
//! - [`config`]: Configuration structure
//! - [`neighborhood`]: Cache-line neighborhood geometry and probe walk
//! - [`storage`]: Slot allocation strategies
//! - [`release`]: Release notification for cleared payloads
//! - [`metrics`]: Operation counters (requires `stats` feature)

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(test)]
extern crate scoped_threadpool;

/// Lock-free cache implementation.
///
/// Provides [`LocklessCache`], the insert-or-find / eviction-trade protocol,
/// bulk clearing and teardown.
pub mod cache;

/// Cache configuration structure.
pub mod config;

/// Neighborhood geometry.
///
/// Maps a home slot to the run of slots sharing its cache line and walks it.
pub mod neighborhood;

/// Release capability invoked for payloads removed by a clear.
pub mod release;

/// Slot storage and pluggable allocation strategies.
pub mod storage;

/// NUMA-interleaved slot storage.
///
/// Available with the `numa` feature on Linux.
#[cfg(all(feature = "numa", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(feature = "numa")))]
pub mod numa;

/// Cache metrics system.
///
/// Available when the `stats` feature is enabled.
#[cfg(feature = "stats")]
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
pub mod metrics;

/// Hash builder used when none is supplied.
#[cfg(feature = "hashbrown")]
pub type DefaultHashBuilder = hashbrown::DefaultHashBuilder;

/// Hash builder used when none is supplied.
#[cfg(all(not(feature = "hashbrown"), feature = "std"))]
pub type DefaultHashBuilder = std::collections::hash_map::RandomState;

#[cfg(all(not(feature = "hashbrown"), not(feature = "std")))]
compile_error!("either the `hashbrown` or the `std` feature must be enabled");

pub use cache::{LocklessCache, PutOutcome, EMPTY};
pub use config::{LocklessCacheConfig, Placement};
pub use release::Release;
pub use storage::{AlignedAllocator, SlotAllocator};

#[cfg(all(feature = "numa", target_os = "linux"))]
pub use numa::InterleavedAllocator;

#[cfg(feature = "stats")]
pub use metrics::{CacheMetrics, MetricsSnapshot};
