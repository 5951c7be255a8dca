// Copyright (C) Microsoft Corporation. All rights reserved.

//! Model configuration.

use std::env::var;
use std::str::FromStr;

use crate::error::ModelError;
use crate::error::ModelResult;

/// IV length of a freshly created cipher context.
pub const DEFAULT_IV_LEN: usize = 12;

/// Key length of a freshly created cipher context.
pub const DEFAULT_KEY_LEN: usize = 32;

const ENV_MAX_SIGNATURE_SIZE: &str = "EVP_MODEL_MAX_SIGNATURE_SIZE";
const ENV_MAX_DERIVATION_SIZE: &str = "EVP_MODEL_MAX_DERIVATION_SIZE";
const ENV_MAX_ENCRYPTION_SIZE: &str = "EVP_MODEL_MAX_ENCRYPTION_SIZE";
const ENV_MAX_DECRYPTION_SIZE: &str = "EVP_MODEL_MAX_DECRYPTION_SIZE";
const ENV_ALLOCATION_FAILURE: &str = "EVP_MODEL_ALLOCATION_FAILURE";

/// Largest outputs the asymmetric operations report when queried with no
/// output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    /// Largest signature (DER encoded ECDSA over P-256 by default)
    pub signature: usize,
    /// Largest derived secret
    pub derivation: usize,
    /// Largest ciphertext
    pub encryption: usize,
    /// Largest plaintext
    pub decryption: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            signature: 72,
            derivation: 32,
            encryption: 512,
            decryption: 512,
        }
    }
}

/// Tunables shared by every object created against a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// IV length of a freshly created cipher context
    pub default_iv_len: usize,
    /// Key length of a freshly created cipher context
    pub default_key_len: usize,
    /// Maximum output sizes of the asymmetric operations
    pub size_limits: SizeLimits,
    /// Offer an allocation-failure branch on every create operation
    pub model_allocation_failure: bool,
    /// Codes returned on failure branches; all must be `<= 0`
    pub failure_codes: Vec<i32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_iv_len: DEFAULT_IV_LEN,
            default_key_len: DEFAULT_KEY_LEN,
            size_limits: SizeLimits::default(),
            model_allocation_failure: false,
            failure_codes: vec![0, -1, -2],
        }
    }
}

impl ModelConfig {
    /// Default configuration with overrides from `EVP_MODEL_*` environment
    /// variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| var(name).ok())
    }

    /// Default configuration with overrides taken from `lookup`.
    ///
    /// Values that do not parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let limits = &mut config.size_limits;

        override_from(&lookup, ENV_MAX_SIGNATURE_SIZE, &mut limits.signature);
        override_from(&lookup, ENV_MAX_DERIVATION_SIZE, &mut limits.derivation);
        override_from(&lookup, ENV_MAX_ENCRYPTION_SIZE, &mut limits.encryption);
        override_from(&lookup, ENV_MAX_DECRYPTION_SIZE, &mut limits.decryption);
        override_from(
            &lookup,
            ENV_ALLOCATION_FAILURE,
            &mut config.model_allocation_failure,
        );

        config
    }

    /// Replaces the asymmetric size limits.
    pub fn with_size_limits(mut self, size_limits: SizeLimits) -> Self {
        self.size_limits = size_limits;
        self
    }

    /// Enables or disables allocation-failure branches.
    pub fn with_allocation_failure(mut self, enabled: bool) -> Self {
        self.model_allocation_failure = enabled;
        self
    }

    /// Replaces the codes offered on failure branches.
    pub fn with_failure_codes(mut self, codes: impl Into<Vec<i32>>) -> Self {
        self.failure_codes = codes.into();
        self
    }

    /// Checks the configuration is usable.
    pub fn validate(&self) -> ModelResult<()> {
        if self.failure_codes.is_empty() {
            Err(ModelError::InvalidConfig(
                "failure_codes must not be empty".to_string(),
            ))?;
        }
        if let Some(code) = self.failure_codes.iter().find(|code| **code > 0) {
            Err(ModelError::InvalidConfig(format!(
                "failure code {code} is positive"
            )))?;
        }
        if self.default_iv_len == 0 {
            Err(ModelError::InvalidConfig(
                "default_iv_len must be positive".to_string(),
            ))?;
        }
        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(value) = lookup(name) else {
        return;
    };

    match value.trim().parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => tracing::warn!(name, value = %value, "ModelConfig: ignoring unparsable override"),
    }
}
