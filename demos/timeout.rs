use std::{sync::Arc, thread, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::info;
use settle::{any, Error, Future, SettlableFuture};

/// Race a slow computation against a timer.
#[derive(Parser)]
struct Args {
    /// How long the real work takes.
    #[arg(long, default_value_t = 1000)]
    work_ms: u64,

    /// How long to wait before giving up.
    #[arg(long, default_value_t = 50)]
    timeout_ms: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let work_ms = args.work_ms;
    let work = Arc::new(SettlableFuture::new(move || {
        thread::sleep(Duration::from_millis(work_ms));
        Ok(String::from("Hello Future!"))
    }));

    let timeout_ms = args.timeout_ms;
    let timeout = Arc::new(SettlableFuture::new(move || {
        thread::sleep(Duration::from_millis(timeout_ms));
        Err(Error::msg("Timed out!"))
    }));

    let race = any([work.clone(), timeout]);
    race.settle();

    match race.result() {
        Ok(message) => println!("{message}"),
        Err(e) => println!("{e}"),
    }

    // The losing computation is not cancelled.
    if !work.is_settled() {
        info!("Work is still running in the background");
    }

    Ok(())
}
