//! Randomness for block arrival and synthetic block contents

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of the random draws the block producer makes
pub trait Entropy {
    /// Uniform value in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Uniform 64-bit value, used for hash salts
    fn next_u64(&mut self) -> u64;
}

impl<T: Entropy + ?Sized> Entropy for Box<T> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }

    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Entropy backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngEntropy<R> {
    rng: R,
}

impl<R: RngCore> RngEntropy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngEntropy<StdRng> {
    /// Reproducible run
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Seeded from the operating system
    pub fn from_os() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: RngCore> Entropy for RngEntropy<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

/// Replays a fixed list of unit values, cycling when exhausted.
///
/// `next_u64` returns a running counter so hashes stay distinct.
#[derive(Debug, Clone)]
pub struct ScriptedEntropy {
    values: Vec<f64>,
    cursor: usize,
    counter: u64,
}

impl ScriptedEntropy {
    pub fn new(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.0] } else { values };
        Self {
            values,
            cursor: 0,
            counter: 0,
        }
    }

    /// Every draw returns `value`
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl Entropy for ScriptedEntropy {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}
