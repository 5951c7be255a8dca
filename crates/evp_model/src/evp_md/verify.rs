// Copyright (C) Microsoft Corporation. All rights reserved.

//! Digest-then-verify flows (`EVP_DigestVerify*`).
//!
//! Digesting and the asymmetric verify collapse into one opaque decision at
//! [`EvpMdCtx::digest_verify_final`]. Only the single-context form is
//! modeled: the asymmetric context created by init lives inside the digest
//! context and is never handed to the caller.

use super::ctx::EvpMdCtx;
use super::md::EvpMd;
use crate::error::require;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::evp_pkey::ctx::EvpPKeyCtx;
use crate::evp_pkey::pkey::EvpPKey;
use crate::oracle::site;

/// Result of a verify final.
///
/// Only [`VerifyOutcome::Verified`] means the signature matched. A mismatch
/// is an expected outcome; an error is anything else the engine returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Return value 1
    Verified,
    /// Return value 0
    Mismatch,
    /// Any other return value
    Error(i32),
}

impl VerifyOutcome {
    /// Classifies a raw return value.
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => VerifyOutcome::Verified,
            0 => VerifyOutcome::Mismatch,
            other => VerifyOutcome::Error(other),
        }
    }

    /// Raw return value.
    pub fn as_raw(self) -> i32 {
        match self {
            VerifyOutcome::Verified => 1,
            VerifyOutcome::Mismatch => 0,
            VerifyOutcome::Error(code) => code,
        }
    }

    /// Signature matched.
    pub fn is_verified(self) -> bool {
        self == VerifyOutcome::Verified
    }
}

impl From<VerifyOutcome> for ReturnCode {
    fn from(outcome: VerifyOutcome) -> Self {
        ReturnCode::new(outcome.as_raw())
    }
}

impl EvpMdCtx {
    /// Set up verification of data digested with `md` under `pkey`
    ///
    /// # Argument
    /// * `md` - Digest descriptor; must be valid
    /// * `pkey` - Verification key; must be valid
    ///
    /// # Return
    /// 1 with the digest and an internal asymmetric context bound, or 0
    pub fn digest_verify_init(&mut self, md: &EvpMd, pkey: &EvpPKey) -> ModelResult<ReturnCode> {
        const OP: &str = "EvpMdCtx::digest_verify_init";
        require(md.is_valid(), OP, "digest is not valid")?;
        require(pkey.is_valid(), OP, "key is not valid")?;

        if !self.provider().succeeds(site::DIGEST_VERIFY_INIT) {
            tracing::debug!("{OP}: failed");
            return Ok(ReturnCode::FAIL);
        }

        let pctx = EvpPKeyCtx::new(pkey)?;
        self.bind(md, site::DIGEST_INIT_OUTPUT);
        self.set_pkey_ctx(pctx);
        Ok(ReturnCode::SUCCESS)
    }

    /// Absorb data to be verified
    pub fn digest_verify_update(&mut self, data: &[u8]) -> ModelResult<ReturnCode> {
        self.digest_update(data)
    }

    /// Verify `sig` against the data absorbed so far
    ///
    /// The caller must have completed init and its updates; the context
    /// must be valid. Arguments are not modified.
    pub fn digest_verify_final(&mut self, sig: &[u8]) -> ModelResult<VerifyOutcome> {
        require(
            self.is_valid(),
            "EvpMdCtx::digest_verify_final",
            "digest context is not valid",
        )?;

        let outcome = match self.provider().choose(site::DIGEST_VERIFY_FINAL, 2) {
            0 => VerifyOutcome::Verified,
            1 => VerifyOutcome::Mismatch,
            _ => VerifyOutcome::Error(ReturnCode::ERROR.get()),
        };
        tracing::trace!(sig_len = sig.len(), ?outcome, "EvpMdCtx::digest_verify_final");
        Ok(outcome)
    }
}
