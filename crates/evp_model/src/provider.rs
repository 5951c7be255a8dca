// Copyright (C) Microsoft Corporation. All rights reserved.

//! The provider handle shared by every modeled object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::subscriber::DefaultGuard;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::log::init_log;
use crate::model_log;
use crate::model_log_noerror;
use crate::oracle::site;
use crate::oracle::NominalOracle;
use crate::oracle::Oracle;

struct ProviderInner {
    config: ModelConfig,
    oracle: RefCell<Box<dyn Oracle>>,
    _log_guard: Option<DefaultGuard>,
}

/// Handle to a modeled provider.
///
/// Cloning is cheap and yields another handle to the same oracle and
/// configuration. A provider and everything created from it belong to one
/// thread.
#[derive(Clone)]
pub struct Provider {
    inner: Rc<ProviderInner>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::nominal()
    }
}

impl Provider {
    /// Creates a provider consulting `oracle` under `config`.
    pub fn new(config: ModelConfig, oracle: impl Oracle + 'static) -> Self {
        Self::from_parts(config, Box::new(oracle), None)
    }

    /// Deterministic provider with the default configuration.
    pub fn nominal() -> Self {
        Self::new(ModelConfig::default(), NominalOracle)
    }

    /// Starts building a provider.
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::default()
    }

    fn from_parts(
        config: ModelConfig,
        oracle: Box<dyn Oracle>,
        log_guard: Option<DefaultGuard>,
    ) -> Self {
        Self {
            inner: Rc::new(ProviderInner {
                config,
                oracle: RefCell::new(oracle),
                _log_guard: log_guard,
            }),
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ModelConfig {
        &self.inner.config
    }

    /// Asks the oracle for a choice in `0..=max`.
    pub(crate) fn choose(&self, site: &'static str, max: u64) -> u64 {
        let choice = self.inner.oracle.borrow_mut().choose(site, max);
        if choice > max {
            model_log_noerror!(
                tracing::Level::WARN,
                "Provider::choose: oracle returned {choice} at {site}, clamping to {max}",
            );
            return max;
        }

        tracing::trace!(site, choice, max, "choice");
        choice
    }

    /// Nominal branch is success.
    pub(crate) fn succeeds(&self, site: &'static str) -> bool {
        self.choose(site, 1) == 0
    }

    /// Length in `0..=max`, nominally `max`.
    pub(crate) fn any_len(&self, site: &'static str, max: usize) -> usize {
        let reduction = self.choose(site, max as u64) as usize;
        max - reduction
    }

    /// `1` or `0`.
    pub(crate) fn any_bool_code(&self, site: &'static str) -> ReturnCode {
        ReturnCode::from(self.succeeds(site))
    }

    /// `1` or one of the configured failure codes.
    pub(crate) fn any_code(&self, site: &'static str) -> ReturnCode {
        let codes = &self.inner.config.failure_codes;
        match self.choose(site, codes.len() as u64) as usize {
            0 => ReturnCode::SUCCESS,
            index => codes
                .get(index - 1)
                .copied()
                .map_or(ReturnCode::FAIL, ReturnCode::new),
        }
    }

    /// One of the configured failure codes.
    pub(crate) fn any_failure_code(&self, site: &'static str) -> ReturnCode {
        let codes = &self.inner.config.failure_codes;
        let max = codes.len().saturating_sub(1) as u64;
        let index = self.choose(site, max) as usize;
        codes
            .get(index)
            .copied()
            .map_or(ReturnCode::FAIL, ReturnCode::new)
    }

    /// Fills `buf` with unconstrained content.
    pub(crate) fn fill(&self, site: &'static str, buf: &mut [u8]) {
        self.inner.oracle.borrow_mut().fill(site, buf);
    }

    /// Allocation of `what`, failing only when allocation failure is
    /// modeled.
    pub(crate) fn allocate(&self, what: &'static str) -> ModelResult<()> {
        if self.inner.config.model_allocation_failure && !self.succeeds(site::ALLOCATION) {
            model_log!(
                ModelError::AllocationFailed,
                tracing::Level::DEBUG,
                "Provider::allocate: could not allocate {what}",
            );
            Err(ModelError::AllocationFailed)?;
        }
        Ok(())
    }
}

/// Builder for [`Provider`].
#[derive(Default)]
pub struct ProviderBuilder {
    config: Option<ModelConfig>,
    oracle: Option<Box<dyn Oracle>>,
    log_from_env: bool,
}

impl ProviderBuilder {
    /// Uses `config` instead of [`ModelConfig::default`].
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses `oracle` instead of [`NominalOracle`].
    pub fn oracle(mut self, oracle: impl Oracle + 'static) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    /// Installs logging from the environment for the provider's lifetime.
    pub fn log_from_env(mut self, enabled: bool) -> Self {
        self.log_from_env = enabled;
        self
    }

    /// Validates the configuration and creates the provider.
    pub fn build(self) -> ModelResult<Provider> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let log_guard = if self.log_from_env {
            Some(init_log()?)
        } else {
            None
        };
        let oracle = self.oracle.unwrap_or_else(|| Box::new(NominalOracle));

        Ok(Provider::from_parts(config, oracle, log_guard))
    }
}
