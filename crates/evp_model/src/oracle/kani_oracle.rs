// Copyright (C) Microsoft Corporation. All rights reserved.

use super::Oracle;

/// Hands every decision to the model checker.
#[derive(Debug, Default, Clone, Copy)]
pub struct KaniOracle;

impl Oracle for KaniOracle {
    fn choose(&mut self, _site: &'static str, max: u64) -> u64 {
        let choice: u64 = kani::any();
        kani::assume(choice <= max);
        choice
    }

    fn fill(&mut self, _site: &'static str, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = kani::any();
        }
    }
}
