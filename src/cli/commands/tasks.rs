//! `lazypar tasks`: list what `lazypar run` can execute

use crate::cli::Output;
use crate::tasks;
use anyhow::Result;

pub fn execute(output: &Output) -> Result<()> {
    output.header("Built-in tasks");

    let registry = tasks::registry();
    for (name, summary) in registry.entries() {
        output.table_row(name, summary);
    }
    Ok(())
}
