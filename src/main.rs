use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use strand::{Backend, Builder, Strand, current_thread, outln};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Strand - run a batch of native threads writing to the shared output channels"
)]
struct Cli {
    /// Number of threads to start
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Lines each thread writes to standard output
    #[arg(short, long, default_value_t = 10)]
    lines: usize,

    /// Make every thread fail after writing its lines, cycling through
    /// error, panic and unknown-payload failures
    #[arg(long)]
    fail: bool,

    /// Maximum random pause between lines, in milliseconds
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
    jitter: i64,

    /// Use the standard library thread backend instead of the platform default
    #[arg(long)]
    std_backend: bool,

    /// Path to a JSON lifecycle log; "{timestamp}" is replaced
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut runtime = Strand::new().register_main();
    if let Some(path) = &cli.log {
        runtime = runtime.with_log(path);
    }
    runtime.start()?;

    let backend = if cli.std_backend {
        Backend::Std
    } else {
        Backend::default()
    };

    let mut threads = Vec::with_capacity(cli.threads);
    for index in 0..cli.threads {
        let lines = cli.lines;
        let jitter = cli.jitter;
        let fail = cli.fail;

        let thread = Builder::new().backend(backend).spawn(move || {
            let me = current_thread();
            let mut rng = rand::rng();
            for line in 0..lines {
                outln!("{me} line {line}");
                if jitter > 0 {
                    strand::sleep(rng.random_range(0..=jitter))?;
                }
            }

            if fail {
                match index % 3 {
                    0 => anyhow::bail!("worker {index} gave up"),
                    1 => panic!("worker {index} panicked"),
                    _ => std::panic::panic_any(index),
                }
            }
            Ok(())
        });
        threads.push(thread.with_context(|| format!("Failed to start thread {index}"))?);
    }

    for thread in &threads {
        thread
            .join()
            .with_context(|| format!("Failed to join {thread}"))?;
    }

    outln!("{} joined {} threads", current_thread(), threads.len());
    strand::flush_logs()?;
    Ok(())
}
