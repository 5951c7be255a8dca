// Copyright (C) Microsoft Corporation. All rights reserved.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use super::Oracle;
use super::NOMINAL_FILL;
use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::provider::Provider;

/// Wide choice points are explored at these representative values only.
const MIN_VALUE_LIMIT: u64 = 4;

/// One decision taken on an explored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    /// Decision point
    pub site: &'static str,
    /// Value returned to the model
    pub value: u64,
    /// Largest value the model would have accepted
    pub max: u64,
}

/// Summary of a finished exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationReport {
    /// Number of paths executed
    pub paths: usize,
    /// Exploration stopped at the path limit before exhausting the tree
    pub truncated: bool,
}

/// A path on which the client closure returned an error.
#[derive(Debug, thiserror::Error)]
#[error("path {paths} failed: {error}")]
pub struct ExplorationError {
    /// Error returned by the closure
    #[source]
    pub error: ModelError,
    /// Decisions that led to the failure
    pub path: Vec<Choice>,
    /// Paths executed, including the failing one
    pub paths: usize,
}

#[derive(Debug)]
struct Step {
    site: &'static str,
    max: u64,
    candidates: Vec<u64>,
    index: usize,
}

#[derive(Debug, Default)]
struct Trace {
    forced: Vec<usize>,
    steps: Vec<Step>,
}

struct ReplayOracle {
    trace: Rc<RefCell<Trace>>,
    value_limit: u64,
}

impl Oracle for ReplayOracle {
    fn choose(&mut self, site: &'static str, max: u64) -> u64 {
        let mut trace = self.trace.borrow_mut();
        let candidates = candidates(max, self.value_limit);
        let position = trace.steps.len();
        let index = trace
            .forced
            .get(position)
            .copied()
            .unwrap_or(0)
            .min(candidates.len() - 1);
        let value = candidates[index];

        trace.steps.push(Step {
            site,
            max,
            candidates,
            index,
        });
        value
    }

    fn fill(&mut self, _site: &'static str, buf: &mut [u8]) {
        buf.fill(NOMINAL_FILL);
    }
}

/// Values explored at a choice point bounded by `max`.
fn candidates(max: u64, limit: u64) -> Vec<u64> {
    if max <= limit {
        return (0..=max).collect();
    }

    let mut values = vec![0, 1, max / 2, max - 1, max];
    values.sort_unstable();
    values.dedup();
    values
}

/// Runs a client closure once for every distinct sequence of choices.
///
/// Paths are enumerated depth first: after each run the deepest decision
/// that still has an unexplored alternative is advanced and everything after
/// it is reset to the nominal branch. The closure must be deterministic apart
/// from the provider it is handed, otherwise replayed prefixes diverge.
///
/// Choice points with more than `value_limit + 1` alternatives (output
/// lengths, mostly) are explored at their boundaries and midpoint only.
#[derive(Debug, Clone)]
pub struct Explorer {
    config: ModelConfig,
    max_paths: usize,
    value_limit: u64,
}

impl Explorer {
    /// Creates an explorer whose providers use `config`.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            max_paths: 100_000,
            value_limit: 16,
        }
    }

    /// Stops after `max_paths` paths.
    pub fn max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    /// Enumerates choice points up to `value_limit` exhaustively.
    pub fn value_limit(mut self, value_limit: u64) -> Self {
        self.value_limit = value_limit.max(MIN_VALUE_LIMIT);
        self
    }

    /// Explores `client` until every path has run, a path fails, or the path
    /// limit is reached.
    pub fn run<F>(&self, mut client: F) -> Result<ExplorationReport, ExplorationError>
    where
        F: FnMut(&Provider) -> Result<(), ModelError>,
    {
        let mut forced = Vec::new();
        let mut paths = 0;

        loop {
            if paths == self.max_paths {
                tracing::warn!(paths, "Explorer::run: path limit reached");
                return Ok(ExplorationReport {
                    paths,
                    truncated: true,
                });
            }

            let trace = Rc::new(RefCell::new(Trace {
                forced: mem::take(&mut forced),
                steps: Vec::new(),
            }));
            let provider = Provider::new(
                self.config.clone(),
                ReplayOracle {
                    trace: trace.clone(),
                    value_limit: self.value_limit,
                },
            );

            let result = client(&provider);
            paths += 1;
            let steps = mem::take(&mut trace.borrow_mut().steps);

            if let Err(error) = result {
                let path = steps
                    .iter()
                    .map(|step| Choice {
                        site: step.site,
                        value: step.candidates[step.index],
                        max: step.max,
                    })
                    .collect();
                return Err(ExplorationError { error, path, paths });
            }

            match steps
                .iter()
                .rposition(|step| step.index + 1 < step.candidates.len())
            {
                Some(pivot) => {
                    forced = steps[..pivot].iter().map(|step| step.index).collect();
                    forced.push(steps[pivot].index + 1);
                }
                None => {
                    tracing::debug!(paths, "Explorer::run: exhausted");
                    return Ok(ExplorationReport {
                        paths,
                        truncated: false,
                    });
                }
            }
        }
    }
}
