// Copyright (C) Microsoft Corporation. All rights reserved.

//! Sources of nondeterminism.
//!
//! Every branch the real provider may take without the caller being able to
//! predict it (an engine failure, the length of a signature, the bytes of a
//! digest) is routed through an [`Oracle`]. Each decision point is named by a
//! static site string (see [`site`]) and asks for a choice in `0..=max`.
//!
//! Choice `0` is always the nominal outcome: success, the longest permitted
//! output, a verified signature. A deterministic provider is therefore just
//! [`NominalOracle`]; a harness that wants every behavior plugs in the
//! [`Explorer`] instead.

use std::collections::HashMap;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;

mod explorer;
#[cfg(kani)]
mod kani_oracle;
pub mod site;

pub use explorer::Choice;
pub use explorer::ExplorationError;
pub use explorer::ExplorationReport;
pub use explorer::Explorer;
#[cfg(kani)]
pub use kani_oracle::KaniOracle;

/// Byte written by oracles that do not model content.
pub const NOMINAL_FILL: u8 = 0x5a;

/// Pluggable chooser consulted at every nondeterministic decision point.
pub trait Oracle {
    /// Returns a choice in `0..=max` for the decision point `site`.
    fn choose(&mut self, site: &'static str, max: u64) -> u64;

    /// Fills `buf` with unconstrained content produced at `site`.
    fn fill(&mut self, site: &'static str, buf: &mut [u8]);
}

/// Always takes the nominal branch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NominalOracle;

impl Oracle for NominalOracle {
    fn choose(&mut self, _site: &'static str, _max: u64) -> u64 {
        0
    }

    fn fill(&mut self, _site: &'static str, buf: &mut [u8]) {
        buf.fill(NOMINAL_FILL);
    }
}

/// Replays per-site queues of choices and falls back to the nominal branch
/// once a queue is drained.
#[derive(Debug, Default, Clone)]
pub struct ScriptedOracle {
    script: HashMap<&'static str, VecDeque<u64>>,
    consulted: HashMap<&'static str, usize>,
}

impl ScriptedOracle {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `choices` to the queue of `site`.
    pub fn with(mut self, site: &'static str, choices: impl IntoIterator<Item = u64>) -> Self {
        self.script.entry(site).or_default().extend(choices);
        self
    }

    /// Appends one choice to the queue of `site`.
    pub fn push(&mut self, site: &'static str, choice: u64) {
        self.script.entry(site).or_default().push_back(choice);
    }

    /// Number of times `site` has been consulted.
    pub fn consulted(&self, site: &str) -> usize {
        self.consulted.get(site).copied().unwrap_or(0)
    }
}

impl Oracle for ScriptedOracle {
    fn choose(&mut self, site: &'static str, _max: u64) -> u64 {
        *self.consulted.entry(site).or_default() += 1;
        self.script
            .get_mut(site)
            .and_then(VecDeque::pop_front)
            .unwrap_or(0)
    }

    fn fill(&mut self, _site: &'static str, buf: &mut [u8]) {
        buf.fill(NOMINAL_FILL);
    }
}

/// Draws every choice and every byte from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomOracle {
    rng: StdRng,
}

impl RandomOracle {
    /// Creates an oracle whose decisions are reproducible from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Oracle for RandomOracle {
    fn choose(&mut self, _site: &'static str, max: u64) -> u64 {
        self.rng.gen_range(0..=max)
    }

    fn fill(&mut self, _site: &'static str, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }
}
