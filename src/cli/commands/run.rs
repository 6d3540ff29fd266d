//! `lazypar run`: map a built-in task over inputs in parallel

use crate::cli::Output;
use crate::config::{LazyparConfig, ProgressDisplay, WorkerCount};
use crate::parallel::LazyParallel;
use crate::parallel::sink::sink_for;
use crate::tasks;
use anyhow::{Result, bail};
use clap::Args;
use serde_json::Value;
use tracing::debug;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Built-in task to run (see `lazypar tasks`)
    pub task: String,

    /// Inputs, one task per value
    #[arg(value_name = "ITEM", conflicts_with = "range")]
    pub items: Vec<u64>,

    /// Use 0..N as the inputs
    #[arg(long, value_name = "N")]
    pub range: Option<u64>,

    /// Worker processes: "auto" or a positive count
    #[arg(long, value_name = "auto|N")]
    pub cores: Option<WorkerCount>,

    /// Run on worker threads instead of processes
    #[arg(long)]
    pub use_threads: bool,

    /// Worker threads when running on threads
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// How progress is drawn
    #[arg(long, value_enum)]
    pub progress: Option<ProgressDisplay>,
}

impl RunArgs {
    /// Layer command-line flags over the loaded configuration
    fn apply(&self, config: &mut LazyparConfig) {
        if let Some(cores) = self.cores {
            config.pool.cores = cores;
        }
        if self.use_threads {
            config.pool.use_threads = true;
        }
        if let Some(threads) = self.threads {
            config.pool.threads = threads;
        }
        if let Some(style) = self.progress {
            config.progress.style = style;
        }
    }

    fn inputs(&self) -> Vec<Value> {
        match self.range {
            Some(n) => (0..n).map(Value::from).collect(),
            None => self.items.iter().copied().map(Value::from).collect(),
        }
    }
}

pub fn execute(args: RunArgs, config_path: Option<&str>, output: &Output) -> Result<()> {
    let mut config = LazyparConfig::load_with_custom_config(config_path)?;
    args.apply(&mut config);
    debug!("Effective pool configuration: {:?}", config.pool);

    let registry = tasks::registry();
    let Some(task) = registry.task(&args.task) else {
        bail!("unknown task `{}`; run `lazypar tasks` to list them", args.task);
    };

    let display = if output.is_quiet() {
        ProgressDisplay::None
    } else {
        config.progress.style
    };
    let verbose = display != ProgressDisplay::None;

    let mut runner = LazyParallel::new(task, args.inputs(), &config.pool)?
        .with_sink(sink_for(display, config.progress.width));
    let results: Vec<Value> = runner.run(verbose)?;

    println!("{}", serde_json::to_string(&results)?);
    Ok(())
}
