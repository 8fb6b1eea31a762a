//! Opaque errors carried by settled futures.
//!
//! A future never throws across its boundary; a failed computation is part of
//! its settled [Outcome]. Since [Future::result](crate::Future::result) may be
//! called any number of times, the error must be handed out repeatedly, so
//! [Error] is a cheaply clonable handle around an [anyhow::Error]. Clones share
//! the same underlying error, which [Error::ptr_eq] can observe.
use std::{any::Any, error::Error as StdError, fmt, io, sync::Arc};

/// The settled outcome of a future: its value, or the error its computation
/// produced.
pub type Outcome<T> = Result<T, Error>;

/// An opaque, clonable error.
#[derive(Clone)]
pub struct Error {
    inner: Arc<anyhow::Error>,
}

#[derive(Debug)]
struct Panicked(String);

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation panicked: {}", self.0)
    }
}

impl StdError for Panicked {}

impl Error {
    /// Wrap any standard error.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        anyhow::Error::new(err).into()
    }

    /// Create an error from a printable message.
    pub fn msg<M>(msg: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        anyhow::Error::msg(msg).into()
    }

    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };

        Self::new(Panicked(msg))
    }

    /// Returns `true` if this error was produced by catching a panic inside a
    /// computation or transform.
    pub fn is_panic(&self) -> bool {
        self.inner.downcast_ref::<Panicked>().is_some()
    }

    /// Returns `true` if both handles refer to the very same error.
    ///
    /// Errors forwarded through [then](crate::then) chains and
    /// [any](crate::any) races are never rewrapped, so the error observed at
    /// the end of a pipeline is `ptr_eq` to the one that caused it.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Attempt to downcast the error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            inner: Arc::new(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}
