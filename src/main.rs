use std::panic;

use chandelier_sentinel::{Cli, run};
use clap::Parser;
use tokio::runtime::Runtime;

fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Debug)
    } else {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("chandelier_sentinel"), my_code_level)
        .init();

    let args = Cli::parse();

    Runtime::new()?.block_on(run(args))
}
