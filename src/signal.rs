//! Readiness signals.
//!
//! Every future owns a [Signal]: a broadcast-once event that flips from unset
//! to set exactly once, when the future's outcome has been stored. Only the
//! owning future can set it; everyone else can check it, block on it, or
//! wait on it together with other signals through [Select].
//!
//! A signal holds no operating-system resources of its own. Blocking waits
//! park on a condition variable, and [Select] registers itself with each
//! member signal so that whichever is set first wakes it. Callers that need to
//! integrate with their own `poll(2)`/`epoll(7)` loop can ask for a Linux
//! [eventfd](https://man7.org/linux/man-pages/man2/eventfd.2.html) with
//! [Signal::fd]; it is created on first request and becomes readable once the
//! signal is set.
//!
//! # Example
//!
//! ```
//! use settle::{Future, SettlableFuture};
//! use std::time::Duration;
//!
//! let f = SettlableFuture::new(|| Ok(19));
//! let signal = f.settled();
//! assert!(!signal.is_set());
//! assert!(!signal.wait_timeout(Duration::from_millis(10)));
//!
//! f.settle();
//! assert!(signal.is_set());
//! signal.wait();
//! ```
//!
//! Setting is reserved to the future that owns the signal:
//!
//! ```compile_fail
//! use settle::{Future, SettlableFuture};
//!
//! let f = SettlableFuture::new(|| Ok(19));
//! f.settled().set();
//! ```
use std::{
    fmt, io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError,
    },
    time::Duration,
};

use log::{error, trace};
use slab::Slab;

/// Wakes a single blocked [Select].
#[derive(Default)]
struct Wakeup {
    woken: Mutex<bool>,
    cond: Condvar,
}

impl Wakeup {
    fn wake(&self) {
        *lock(&self.woken) = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut woken = lock(&self.woken);
        while !*woken {
            woken = self.cond.wait(woken).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[derive(Default)]
struct State {
    set: bool,
    subscribers: Slab<Arc<Wakeup>>,
}

/// A broadcast-once readiness event.
///
/// See the [module-level documentation](self) for more information.
pub struct Signal {
    state: Mutex<State>,
    cond: Condvar,
    set: AtomicBool,
    fd: OnceLock<OwnedFd>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
            set: AtomicBool::new(false),
            fd: OnceLock::new(),
        }
    }

    /// Set the signal, waking all current waiters. Only the first call has
    /// any effect.
    pub(crate) fn set(&self) {
        let subscribers = {
            let mut state = lock(&self.state);

            if state.set {
                return;
            }

            if let Some(fd) = self.fd.get() {
                if let Err(e) = notify_fd(fd) {
                    error!("Could not notify eventfd {}: {e}", fd.as_raw_fd());
                }
            }

            state.set = true;
            self.set.store(true, Ordering::Release);

            std::mem::take(&mut state.subscribers)
        };

        self.cond.notify_all();

        for (_, wakeup) in subscribers {
            wakeup.wake();
        }

        trace!("Signal {:p} set", self);
    }

    /// Non-blocking check of whether the signal has been set.
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Block the calling thread until the signal is set.
    pub fn wait(&self) {
        if self.is_set() {
            return;
        }

        let mut state = lock(&self.state);
        while !state.set {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block the calling thread until the signal is set or `timeout` has
    /// elapsed. Returns whether the signal is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }

        let state = lock(&self.state);
        let (state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |state| !state.set)
            .unwrap_or_else(PoisonError::into_inner);

        state.set
    }

    /// An eventfd that becomes readable once the signal is set, for waiting on
    /// this signal alongside descriptors the caller owns.
    ///
    /// The descriptor is created on the first call and lives as long as the
    /// signal. It is never read by this crate, so it stays readable for every
    /// poller once set.
    pub fn fd(&self) -> io::Result<BorrowedFd<'_>> {
        if let Some(fd) = self.fd.get() {
            return Ok(fd.as_fd());
        }

        let state = lock(&self.state);

        if let Some(fd) = self.fd.get() {
            return Ok(fd.as_fd());
        }

        let raw = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };

        if raw == -1 {
            return Err(io::Error::last_os_error());
        }

        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        if state.set {
            notify_fd(&fd)?;
        }

        // Creation and `set` both hold the state lock, so the eventfd is
        // written exactly once whichever comes first.
        Ok(self.fd.get_or_init(|| fd).as_fd())
    }

    /// Register `wakeup` to be woken when the signal is set. Returns `None` if
    /// it already is.
    fn subscribe(&self, wakeup: &Arc<Wakeup>) -> Option<usize> {
        let mut state = lock(&self.state);

        if state.set {
            None
        } else {
            Some(state.subscribers.insert(wakeup.clone()))
        }
    }

    fn unsubscribe(&self, token: usize) {
        lock(&self.state).subscribers.try_remove(token);
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("set", &self.is_set())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify_fd(fd: &OwnedFd) -> io::Result<()> {
    let one: u64 = 1;

    loop {
        let ret = unsafe {
            libc::write(
                fd.as_raw_fd(),
                &one as *const u64 as *const _,
                std::mem::size_of::<u64>(),
            )
        };

        if ret != -1 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Wait on many signals at once.
///
/// Each member is a borrowed [Signal] plus an arbitrary piece of data that is
/// handed back when the member is removed. [Select::wait] registers with every
/// member and blocks until at least one of them is set.
///
/// ```
/// use settle::{Future, Select, SettlableFuture};
///
/// let a = SettlableFuture::new(|| Ok(1));
/// let b = SettlableFuture::new(|| Ok(2));
///
/// let mut select = Select::new();
/// select.insert(a.settled(), "a");
/// let key = select.insert(b.settled(), "b");
///
/// b.settle();
/// assert_eq!(select.wait(), vec![key]);
/// assert_eq!(select.remove(key), Some("b"));
/// ```
pub struct Select<'a, T = ()> {
    members: Slab<(&'a Signal, T)>,
}

impl<'a, T> Select<'a, T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            members: Slab::new(),
        }
    }

    /// Create an empty set with room for `capacity` members.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Slab::with_capacity(capacity),
        }
    }

    /// Add a signal to the set, returning the key it is reported under.
    pub fn insert(&mut self, signal: &'a Signal, data: T) -> usize {
        self.members.insert((signal, data))
    }

    /// Remove a member, returning its data.
    pub fn remove(&mut self, key: usize) -> Option<T> {
        self.members.try_remove(key).map(|(_, data)| data)
    }

    /// The data stored with the member under `key`.
    pub fn get(&self, key: usize) -> Option<&T> {
        self.members.get(key).map(|(_, data)| data)
    }

    /// Number of members still in the set.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Block until at least one member is set and return the keys of every
    /// member that is set, in ascending key order.
    ///
    /// An empty set returns an empty list straight away, since nothing could
    /// ever wake it.
    pub fn wait(&self) -> Vec<usize> {
        let ready = self.ready();

        if !ready.is_empty() || self.members.is_empty() {
            return ready;
        }

        let wakeup = Arc::new(Wakeup::default());
        let mut subscriptions = Vec::with_capacity(self.members.len());
        let mut already_set = false;

        for (_, (signal, _)) in self.members.iter() {
            match signal.subscribe(&wakeup) {
                Some(token) => subscriptions.push((*signal, token)),
                None => {
                    already_set = true;
                    break;
                }
            }
        }

        if !already_set {
            wakeup.wait();
        }

        for (signal, token) in subscriptions {
            signal.unsubscribe(token);
        }

        self.ready()
    }

    fn ready(&self) -> Vec<usize> {
        self.members
            .iter()
            .filter(|(_, (signal, _))| signal.is_set())
            .map(|(key, _)| key)
            .collect()
    }
}

impl<T> Default for Select<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}
