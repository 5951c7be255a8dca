// Copyright (C) Microsoft Corporation. All rights reserved.

use bitflags::bitflags;

use super::md::EvpMd;
use super::md::EVP_MAX_MD_SIZE;
use crate::buffer::BoundedWriter;
use crate::error::contract_violation;
use crate::error::require;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::evp_pkey::ctx::EvpPKeyCtx;
use crate::oracle::site;
use crate::provider::Provider;

bitflags! {
    /// `EVP_MD_CTX_FLAG_*`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MdCtxFlags: u32 {
        /// Digest is computed in a single update
        const ONESHOT = 0x0001;
        /// Context has been cleaned
        const CLEANED = 0x0002;
        /// Do not free the context on cleanup
        const REUSE = 0x0004;
        /// Skip digest init
        const NO_INIT = 0x0100;
        /// Finalise the digest when signing
        const FINALISE = 0x0200;

        const _ = !0;
    }
}

/// Outcome of a digest finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestFinal {
    /// Return code of the call
    pub code: ReturnCode,
    /// Digest length; `None` on failure, when the reported length is not
    /// reliable
    pub len: Option<usize>,
}

/// Digest context (`EVP_MD_CTX`).
///
/// Updates are legal only while a digest is bound, that is between a
/// successful init and the next final.
#[derive(Debug)]
pub struct EvpMdCtx {
    provider: Provider,
    digest: Option<EvpMd>,
    md_data: Option<Vec<u8>>,
    pctx: Option<EvpPKeyCtx>,
    flags: MdCtxFlags,
}

impl EvpMdCtx {
    /// Create a new empty context
    pub fn new(provider: &Provider) -> ModelResult<Self> {
        provider.allocate("EvpMdCtx")?;

        Ok(Self {
            provider: provider.clone(),
            digest: None,
            md_data: None,
            pctx: None,
            flags: MdCtxFlags::empty(),
        })
    }

    /// Bound digest, if any.
    pub fn md(&self) -> Option<&EvpMd> {
        self.digest.as_ref()
    }

    /// Asymmetric context created by a verify init, if any.
    pub fn pkey_ctx(&self) -> Option<&EvpPKeyCtx> {
        self.pctx.as_ref()
    }

    /// Scratch state of the bound digest, if allocated.
    pub fn md_data(&self) -> Option<&[u8]> {
        self.md_data.as_deref()
    }

    /// Get the size of the bound digest
    ///
    /// # Return
    /// Contract violation when no digest is bound
    pub fn size(&self) -> ModelResult<usize> {
        self.digest
            .as_ref()
            .map(EvpMd::size)
            .ok_or_else(|| contract_violation("EvpMdCtx::size", "no digest bound"))
    }

    /// Context is usable for a verify final: digest bound, size within
    /// bounds and nested context (if any) valid.
    pub fn is_valid(&self) -> bool {
        self.digest
            .as_ref()
            .is_some_and(|md| md.size() <= EVP_MAX_MD_SIZE)
            && self.pctx.as_ref().map_or(true, EvpPKeyCtx::is_valid)
    }

    pub(crate) fn provider(&self) -> &Provider {
        &self.provider
    }

    pub(crate) fn bind(&mut self, md: &EvpMd, init_site: &'static str) {
        let mut md_data = vec![0u8; md.size()];
        self.provider.fill(init_site, &mut md_data);
        self.digest = Some(*md);
        self.md_data = Some(md_data);
    }

    pub(crate) fn set_pkey_ctx(&mut self, pctx: EvpPKeyCtx) {
        self.pctx = Some(pctx);
    }

    /// Initialize the digest
    ///
    /// # Argument
    /// * `md` - Digest descriptor; must be valid
    ///
    /// # Return
    /// 1 with the digest bound and any nested asymmetric context released,
    /// or 0 with the context unchanged
    pub fn digest_init(&mut self, md: &EvpMd) -> ModelResult<ReturnCode> {
        require(md.is_valid(), "EvpMdCtx::digest_init", "digest is not valid")?;

        if !self.provider.succeeds(site::DIGEST_INIT) {
            tracing::debug!(md = md.md_type().name(), "EvpMdCtx::digest_init: failed");
            return Ok(ReturnCode::FAIL);
        }

        self.bind(md, site::DIGEST_INIT_OUTPUT);
        self.pctx = None;
        Ok(ReturnCode::SUCCESS)
    }

    /// Absorb `data`
    ///
    /// # Return
    /// 1 or 0; contract violation when no digest is bound
    pub fn digest_update(&mut self, data: &[u8]) -> ModelResult<ReturnCode> {
        require(
            self.digest.is_some(),
            "EvpMdCtx::digest_update",
            "no digest bound",
        )?;

        if let Some(md_data) = self.md_data.as_mut() {
            self.provider.fill(site::DIGEST_UPDATE_OUTPUT, md_data);
        }
        tracing::trace!(len = data.len(), "EvpMdCtx::digest_update");
        Ok(self.provider.any_bool_code(site::DIGEST_UPDATE))
    }

    /// Finalize the digest into `out`
    ///
    /// Writes exactly the digest size and unbinds the digest whether or not
    /// the call succeeds; a new init is needed before further updates.
    ///
    /// # Argument
    /// * `out` - Output buffer; must hold the digest size
    pub fn digest_final_ex(&mut self, out: &mut [u8]) -> ModelResult<DigestFinal> {
        const OP: &str = "EvpMdCtx::digest_final_ex";
        let Some(md) = self.digest else {
            return Err(contract_violation(OP, "no digest bound"));
        };

        let size = md.size();
        BoundedWriter::new(OP, out, size)?.write_unconstrained(
            &self.provider,
            site::DIGEST_FINAL_OUTPUT,
            size,
        )?;
        self.digest = None;

        if !self.provider.succeeds(site::DIGEST_FINAL) {
            tracing::debug!("{OP}: failed, length unreliable");
            return Ok(DigestFinal {
                code: ReturnCode::FAIL,
                len: None,
            });
        }

        Ok(DigestFinal {
            code: ReturnCode::SUCCESS,
            len: Some(size),
        })
    }

    /// Finalize the digest and clean up
    ///
    /// Like [`Self::digest_final_ex`], then releases the scratch state and
    /// any nested asymmetric context. The context itself stays allocated and
    /// can be initialized again.
    pub fn digest_final(&mut self, out: &mut [u8]) -> ModelResult<DigestFinal> {
        let result = self.digest_final_ex(out)?;
        self.md_data = None;
        self.pctx = None;
        Ok(result)
    }

    /// Reset the context (`EVP_MD_CTX_reset`)
    ///
    /// # Return
    /// 1 with everything released, or 0 with the context untouched
    pub fn cleanup(&mut self) -> ReturnCode {
        if !self.provider.succeeds(site::MD_CTX_CLEANUP) {
            return ReturnCode::FAIL;
        }

        self.digest = None;
        self.md_data = None;
        self.pctx = None;
        self.flags = MdCtxFlags::empty();
        ReturnCode::SUCCESS
    }

    /// Set flags
    pub fn set_flags(&mut self, flags: MdCtxFlags) {
        self.flags |= flags;
    }

    /// Test flags; returns the subset of `flags` that is set
    pub fn test_flags(&self, flags: MdCtxFlags) -> MdCtxFlags {
        self.flags & flags
    }

    /// Copy `src` into this context
    ///
    /// # Return
    /// 0 if `src` is missing or the engine fails, 1 once the binding,
    /// scratch state, flags and nested context have been copied
    pub fn copy_ex(&mut self, src: Option<&EvpMdCtx>) -> ModelResult<ReturnCode> {
        let Some(src) = src else {
            tracing::warn!("EvpMdCtx::copy_ex: null source");
            return Ok(ReturnCode::FAIL);
        };
        if !self.provider.succeeds(site::MD_CTX_COPY) {
            return Ok(ReturnCode::FAIL);
        }

        let pctx = src.pctx.as_ref().map(EvpPKeyCtx::dup).transpose()?;
        self.digest = src.digest;
        self.md_data = src.md_data.clone();
        self.pctx = pctx;
        self.flags = src.flags;
        Ok(ReturnCode::SUCCESS)
    }

    /// Release the context, its scratch state and nested context.
    pub fn free(self) {
        tracing::trace!(bound = self.digest.is_some(), "EvpMdCtx::free");
    }
}
