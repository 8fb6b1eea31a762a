use std::{sync::Arc, thread, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::debug;
use settle::{all, Future, FutureExt, SettlableFuture};

/// Fetch a few records concurrently and render each through a `then` chain.
#[derive(Parser)]
struct Args {
    /// Number of records to fetch.
    #[arg(long, default_value_t = 3)]
    count: usize,

    /// Simulated fetch latency.
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
}

#[derive(Clone, Debug)]
struct Record {
    id: usize,
    items: Vec<String>,
}

fn fetch(id: usize, delay: Duration) -> Result<Record, settle::Error> {
    thread::sleep(delay);
    debug!("Fetched record {id}");

    Ok(Record {
        id,
        items: vec![format!("PS{id}"), format!("D{}", id * 100)],
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let delay = Duration::from_millis(args.delay_ms);

    let pipelines = (0..args.count)
        .map(|id| {
            let rendered = SettlableFuture::new(move || fetch(id, delay))
                .then(|r: Record| Ok((r.id, r.items)))
                .then(|(id, items): (usize, Vec<String>)| {
                    Ok(format!("{id}: {}", items.join(" - ")))
                });

            Arc::new(rendered)
        })
        .collect::<Vec<_>>();

    let joined = all(pipelines);
    joined.settle();

    for pipeline in joined.result()? {
        println!("{}", pipeline.result()?);
    }

    Ok(())
}
