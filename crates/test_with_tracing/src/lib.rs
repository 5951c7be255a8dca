// Copyright (C) Microsoft Corporation. All rights reserved.

//! `#[test]` attribute whose tests run with tracing output routed to the
//! test harness.
//!
//! Output is captured per test and shown only for failing tests unless
//! `--nocapture` is passed. `RUST_LOG` overrides the default filter, which
//! shows every model decision and warnings from everything else.

#[cfg(test)]
extern crate self as test_with_tracing;

use std::sync::Once;

pub use test_with_tracing_macro::test;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVES: &str = "evp_model=trace,warn";

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVES`].
pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

#[doc(hidden)]
pub fn init() {
    static ONCE: Once = Once::new();

    ONCE.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .compact()
            .with_ansi(false)
            .with_test_writer()
            .with_env_filter(default_filter())
            .with_file(true)
            .with_line_number(true)
            .try_init();

        // Another harness may already own the global subscriber.
        if let Err(err) = installed {
            eprintln!("test_with_tracing: keeping existing subscriber: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::test;
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::trace!("still one subscriber");
    }

    #[test]
    fn test_with_return() -> Result<(), Box<dyn std::error::Error>> {
        let directives: EnvFilter = DEFAULT_DIRECTIVES.parse()?;
        tracing::debug!(%directives, "parsed default filter");
        Ok(())
    }
}
