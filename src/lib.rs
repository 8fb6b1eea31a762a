//! # `settle`: settle-once futures for threads
//!
//! This crate implements a small, value-agnostic future primitive. A future
//! wraps a deferred computation that runs at most once, when some caller
//! *settles* it. Its readiness can be checked without blocking, and its
//! outcome can be retrieved with blocking semantics by any number of threads
//! at once.
//!
//! There is no executor here: the caller decides on which thread a future is
//! settled. The only threads this crate starts itself are the ones the
//! [all] and [any] combinators launch, one per input future.
//!
//! Readiness is a broadcast-once [Signal] per future (see the [signal]
//! module). Waiting on it is always a genuine blocking wait, several futures
//! can be waited on together through [Select], and a Linux `eventfd` can be
//! requested for integration with a caller's own `poll(2)` loop. A future
//! holds no file descriptor unless one is asked for.
//!
//! The building blocks are:
//!
//! - [SettlableFuture]: the base future over a closure.
//! - [then]: a dependent transform that short-circuits on error.
//! - [all]: join-all, completing once every input has settled.
//! - [any]: race-any, completing with the first input to settle.
//!
//! A computation that panics does not poison anything: the panic is caught and
//! stored as the future's [Error] (see [Error::is_panic]).
//!
//! ## Example
//!
//! ```
//! use settle::{then, Future, SettlableFuture};
//! use std::{sync::Arc, thread};
//!
//! let fetch = SettlableFuture::new(|| Ok(vec!["PS5", "D100"]));
//! let text = Arc::new(then(fetch, |items: Vec<&str>| Ok(items.join(" - "))));
//!
//! {
//!     let text = text.clone();
//!     thread::spawn(move || text.settle());
//! }
//!
//! assert_eq!(text.result().unwrap(), "PS5 - D100");
//! ```
pub mod combinators;
mod error;
mod future;
mod settlable;
pub mod signal;

pub use combinators::{all, any, then, Then};
pub use error::{Error, Outcome};
pub use future::{Future, FutureExt, SharedFuture};
pub use settlable::SettlableFuture;
pub use signal::{Select, Signal};
