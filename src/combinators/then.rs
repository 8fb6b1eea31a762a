//! Sequential dependent transforms.
use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use crate::{
    error::{Error, Outcome},
    future::Future,
    settlable::Slot,
    signal::Signal,
};

type Transform<In, Out> = Box<dyn FnOnce(In) -> Outcome<Out> + Send>;

/// A future derived from another future's successful outcome.
///
/// Settling a `Then` first settles its upstream future, which is how demand
/// propagates backwards through a chain. If the upstream failed, its error is
/// forwarded unchanged and the transform never runs.
pub struct Then<F: Future, Out> {
    upstream: F,
    transform: Mutex<Option<Transform<F::Output, Out>>>,
    slot: Slot<Out>,
}

/// Chain `transform` onto `upstream`.
///
/// ```
/// use settle::{then, Future, SettlableFuture};
///
/// let step1 = SettlableFuture::new(|| Ok(19));
/// let step2 = then(step1, |n: i32| Ok(i64::from(n)));
/// let step3 = then(step2, |n: i64| Ok(n.to_string()));
///
/// step3.settle();
/// assert_eq!(step3.result().unwrap(), "19");
/// ```
pub fn then<F, Out, T>(upstream: F, transform: T) -> Then<F, Out>
where
    F: Future,
    T: FnOnce(F::Output) -> Outcome<Out> + Send + 'static,
{
    Then {
        upstream,
        transform: Mutex::new(Some(Box::new(transform))),
        slot: Slot::new(),
    }
}

impl<F: Future, Out> Then<F, Out> {
    /// The future this one is derived from.
    pub fn upstream(&self) -> &F {
        &self.upstream
    }
}

impl<F, Out> Future for Then<F, Out>
where
    F: Future,
    Out: Clone + Send + Sync,
{
    type Output = Out;

    fn settle(&self) {
        self.upstream.settle();

        self.slot.fill(|| {
            let transform = self
                .transform
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            let input = self.upstream.result()?;

            match transform {
                Some(f) => f(input),
                None => Err(Error::msg("transform already consumed")),
            }
        });
    }

    fn settled(&self) -> &Signal {
        self.slot.signal()
    }

    fn result(&self) -> Outcome<Out> {
        self.slot.outcome()
    }
}

impl<F: Future, Out> fmt::Debug for Then<F, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Then")
            .field("settled", &self.slot.is_filled())
            .finish_non_exhaustive()
    }
}
