use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{WheelError, WheelResult};

/// Source of uniform indices. Injected everywhere randomness is consumed so
/// tests can swap in a seeded or scripted generator.
pub trait RandomSource {
    /// Uniform value in `[0, upper)`. Callers never pass `upper == 0`.
    fn below(&mut self, upper: usize) -> usize;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn below(&mut self, upper: usize) -> usize {
        (**self).below(upper)
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn below(&mut self, upper: usize) -> usize {
        (**self).below(upper)
    }
}

/// Process-wide entropy through the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&mut self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn below(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }
}

/// Replays a fixed list of draws, each reduced modulo the requested bound.
/// Falls back to 0 once the script runs out.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandom {
    script: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        ScriptedRandom {
            script: script.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn below(&mut self, upper: usize) -> usize {
        self.script.pop_front().map(|v| v % upper).unwrap_or(0)
    }
}

pub fn random_source_from_seed(seed: Option<u64>) -> Box<dyn RandomSource + Send> {
    match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    }
}

/// Uniform index over a pool of `pool_size` entries.
pub fn draw_index<R: RandomSource + ?Sized>(rng: &mut R, pool_size: usize) -> WheelResult<usize> {
    if pool_size == 0 {
        return Err(WheelError::invalid("cannot draw from an empty pool"));
    }
    Ok(rng.below(pool_size))
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T, R: RandomSource + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}
