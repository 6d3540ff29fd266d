//! Built-in tasks shipped with the `lazypar` binary
//!
//! The binary is also the worker program of its own process pool, so every
//! task here has to be registered before `main` looks at the command line.

use crate::parallel::TaskRegistry;
use anyhow::{Result, bail};
use std::time::Duration;

pub fn identity(x: u64) -> Result<u64> {
    Ok(x)
}

pub fn square(x: u64) -> Result<u64> {
    match x.checked_mul(x) {
        Some(squared) => Ok(squared),
        None => bail!("{x} squared overflows u64"),
    }
}

/// Sleep for a second and hand the input back
pub fn sleep(x: u64) -> Result<u64> {
    std::thread::sleep(Duration::from_secs(1));
    Ok(x)
}

/// Number of Collatz steps needed to reach 1
pub fn collatz(x: u64) -> Result<u64> {
    if x == 0 {
        bail!("collatz is undefined for 0");
    }

    let mut n = x;
    let mut steps = 0;
    while n != 1 {
        n = if n % 2 == 0 {
            n / 2
        } else {
            match n.checked_mul(3).and_then(|n| n.checked_add(1)) {
                Some(next) => next,
                None => bail!("collatz sequence of {x} overflows u64"),
            }
        };
        steps += 1;
    }
    Ok(steps)
}

/// Integer square root, failing for anything that is not a perfect square
pub fn exact_sqrt(x: u64) -> Result<u64> {
    let root = x.isqrt();
    if root * root != x {
        bail!("{x} is not a perfect square");
    }
    Ok(root)
}

pub fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry
        .register("identity", "return the input unchanged", identity)
        .register("square", "x * x", square)
        .register("sleep", "sleep one second, return the input", sleep)
        .register("collatz", "steps for x to reach 1 in the Collatz sequence", collatz)
        .register("exact_sqrt", "square root of a perfect square, error otherwise", exact_sqrt);
    registry
}
