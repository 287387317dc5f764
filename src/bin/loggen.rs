use std::{sync::Arc, thread, time::Instant};

use anyhow::{Result, bail};
use clap::Parser;
use logs_plus::{Field, LogConfig, LoggerFactory, Severity};

#[derive(Debug, Parser)]
#[command(author, version, about = "Emit structured log records from parallel workers", long_about = None)]
struct Args {
    /// Output destination: "stdout", "stderr" or a file path. Repeatable.
    #[arg(long = "output", default_value = "stdout")]
    outputs: Vec<String>,
    /// Destination for write and sync failures. Repeatable.
    #[arg(long = "error-output", default_value = "stderr")]
    error_outputs: Vec<String>,
    /// Minimum severity written
    #[arg(long, default_value = "debug")]
    level: Severity,
    /// Severity of the generated records
    #[arg(long, default_value = "debug")]
    emit: Severity,
    #[arg(long, default_value_t = 4)]
    threads: usize,
    /// Records per worker thread
    #[arg(long, default_value_t = 1000)]
    count: usize,
    #[arg(long, default_value_t = false, help = "Start from the development preset")]
    development: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.emit == Severity::Fatal {
        bail!("--emit fatal would exit on the first record");
    }

    let mut config = if args.development {
        LogConfig::development()
    } else {
        LogConfig::production()
    };
    config.level = args.level;
    config.output_paths = args.outputs;
    config.error_output_paths = args.error_outputs;
    let factory = Arc::new(LoggerFactory::new(config));

    let started = Instant::now();
    let workers: Vec<_> = (0..args.threads)
        .map(|worker| {
            let factory = Arc::clone(&factory);
            let (emit, count) = (args.emit, args.count);
            thread::spawn(move || {
                let log = factory
                    .acquire()
                    .with(&[Field::uint("worker", worker as u64)]);
                for seq in 0..count {
                    log.log(
                        emit,
                        "I am a Debug",
                        &[
                            Field::string("f0", "I go to school by bus"),
                            Field::string("f1", "Goodest english"),
                            Field::uint("seq", seq as u64),
                        ],
                    );
                }
                log.sync()
            })
        })
        .collect();
    for worker in workers {
        match worker.join() {
            Ok(synced) => synced?,
            Err(_) => bail!("worker thread panicked"),
        }
    }
    let elapsed = started.elapsed();

    let records = (args.threads * args.count) as u64;
    let log = factory.acquire();
    let _flush = log.sync_on_drop();
    log.info(
        "emission finished",
        &[
            Field::uint("records", records),
            Field::uint("elapsed_us", elapsed.as_micros() as u64),
            Field::uint(
                "ns_per_record",
                (elapsed.as_nanos() / u128::from(records.max(1))) as u64,
            ),
        ],
    );
    Ok(())
}
