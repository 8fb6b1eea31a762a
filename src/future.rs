//! The future capability contract.
//!
//! Anything that implements [Future] can be settled, checked for readiness
//! without blocking, and asked for its outcome with blocking semantics. The
//! combinators in [combinators](crate::combinators) consume futures and
//! produce new ones, so composition is closed: a [Then](crate::Then) can wrap
//! another `Then`, [all](crate::all) can join the results of [any](crate::any),
//! and so on.
use std::sync::Arc;

use crate::{
    combinators::{then, Then},
    error::Outcome,
    signal::Signal,
};

/// A handle to a computation that may not yet have produced its outcome.
pub trait Future: Send + Sync {
    /// The value produced on success.
    type Output;

    /// Run the computation if no caller has done so yet, and return once its
    /// outcome is stored. Safe to call any number of times from any number of
    /// threads; the computation runs at most once.
    fn settle(&self);

    /// The readiness signal, set once the outcome is stored. Checking it never
    /// blocks.
    fn settled(&self) -> &Signal;

    /// Block until the future is settled, then return its outcome. Every call
    /// after settlement returns the same outcome.
    ///
    /// This does *not* trigger settlement; some other caller has to call
    /// [Future::settle].
    fn result(&self) -> Outcome<Self::Output>;

    /// Non-blocking readiness check.
    fn is_settled(&self) -> bool {
        self.settled().is_set()
    }
}

/// A type-erased, shareable future. Useful for joining or racing futures of
/// different concrete types that share an output type.
pub type SharedFuture<T> = Arc<dyn Future<Output = T>>;

impl<F: Future + ?Sized> Future for &F {
    type Output = F::Output;

    fn settle(&self) {
        (**self).settle()
    }

    fn settled(&self) -> &Signal {
        (**self).settled()
    }

    fn result(&self) -> Outcome<Self::Output> {
        (**self).result()
    }
}

impl<F: Future + ?Sized> Future for Box<F> {
    type Output = F::Output;

    fn settle(&self) {
        (**self).settle()
    }

    fn settled(&self) -> &Signal {
        (**self).settled()
    }

    fn result(&self) -> Outcome<Self::Output> {
        (**self).result()
    }
}

impl<F: Future + ?Sized> Future for Arc<F> {
    type Output = F::Output;

    fn settle(&self) {
        (**self).settle()
    }

    fn settled(&self) -> &Signal {
        (**self).settled()
    }

    fn result(&self) -> Outcome<Self::Output> {
        (**self).result()
    }
}

/// Method-call sugar over the combinators.
pub trait FutureExt: Future + Sized {
    /// See [then](crate::then).
    fn then<Out, T>(self, transform: T) -> Then<Self, Out>
    where
        T: FnOnce(Self::Output) -> Outcome<Out> + Send + 'static,
    {
        then(self, transform)
    }

    /// Erase the concrete type of this future.
    fn shared(self) -> SharedFuture<Self::Output>
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<F: Future> FutureExt for F {}
