//! Future combinators.
//!
//! Each combinator consumes existing futures and returns a new one, so they
//! nest freely:
//!
//! - `then`: transform the successful outcome of one future, short-circuiting
//!   on its error.
//! - `all`: settle many futures concurrently and complete once every one of
//!   them has settled.
//! - `any`: settle many futures concurrently and complete with the outcome of
//!   whichever settles first.
//!
//! `all` and `any` launch one OS thread per input future, so that a slow
//! computation never delays the start of the others. These threads are
//! detached; nothing is ever cancelled.
use std::{io, sync::Arc, thread};

use crate::future::Future;

mod all;
mod any;
mod then;

pub use all::all;
pub use any::any;
pub use then::{then, Then};

fn settle_detached<F>(future: Arc<F>, name: String) -> io::Result<()>
where
    F: Future + ?Sized + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(move || future.settle())?;

    Ok(())
}
