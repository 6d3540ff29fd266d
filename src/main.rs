use anyhow::Result;
use clap::Parser;
use lazypar::Cli;

fn main() -> Result<()> {
    // Worker processes spawned by the process pool land here
    if lazypar::parallel::serve_if_requested(&lazypar::tasks::registry())? {
        return Ok(());
    }

    let cli = Cli::parse();
    if cli.run().is_err() {
        // Already reported on stderr
        std::process::exit(1);
    }
    Ok(())
}
