// Copyright (C) Microsoft Corporation. All rights reserved.

//! Keyed-hash contexts (`HMAC_CTX`) and the one-shot `HMAC()` call.

use std::fmt;
use std::ops::Deref;

use parking_lot::Mutex;

use crate::buffer::BoundedWriter;
use crate::error::contract_violation;
use crate::error::require;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::evp_md::ctx::DigestFinal;
use crate::evp_md::md::EvpMd;
use crate::evp_md::md::EVP_MAX_MD_SIZE;
use crate::oracle::site;
use crate::provider::Provider;

/// Fallback output of [`hmac`] when the caller passes no buffer.
static HMAC_STATIC_OUTPUT: Mutex<[u8; EVP_MAX_MD_SIZE]> =
    parking_lot::const_mutex([0u8; EVP_MAX_MD_SIZE]);

/// Keyed-hash context.
///
/// The digest can only change together with a new key; reusing the current
/// key under a different digest is refused.
pub struct HmacCtx {
    provider: Provider,
    md: Option<EvpMd>,
    key_len: Option<usize>,
}

impl fmt::Debug for HmacCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacCtx")
            .field("md", &self.md)
            .field("keyed", &self.key_len.is_some())
            .finish()
    }
}

impl HmacCtx {
    /// Create an initialized context with nothing bound.
    pub fn new(provider: &Provider) -> ModelResult<Self> {
        provider.allocate("HmacCtx")?;

        Ok(Self {
            provider: provider.clone(),
            md: None,
            key_len: None,
        })
    }

    /// Bound digest, if any.
    pub fn md(&self) -> Option<&EvpMd> {
        self.md.as_ref()
    }

    /// Initialize or reuse the context
    ///
    /// # Argument
    /// * `key` - New key, or `None` to keep the current one
    /// * `md` - New digest, or `None` to keep the current one
    ///
    /// # Return
    /// 0 without any change when the request would reuse a key that was
    /// never set or pair the current key with a different digest;
    /// otherwise 1 or 0
    pub fn init_ex(&mut self, key: Option<&[u8]>, md: Option<&EvpMd>) -> ModelResult<ReturnCode> {
        const OP: &str = "HmacCtx::init_ex";
        if let Some(md) = md {
            require(md.is_valid(), OP, "digest is not valid")?;
        }

        match (key, md) {
            (Some(key), Some(md)) => {
                self.md = Some(*md);
                self.key_len = Some(key.len());
            }
            (Some(key), None) => {
                if self.md.is_none() {
                    tracing::warn!("{OP}: key without a digest");
                    return Ok(ReturnCode::FAIL);
                }
                self.key_len = Some(key.len());
            }
            (None, Some(md)) => {
                if self.md.as_ref() != Some(md) || self.key_len.is_none() {
                    tracing::warn!("{OP}: cannot reuse key with a different digest");
                    return Ok(ReturnCode::FAIL);
                }
            }
            (None, None) => {
                if self.md.is_none() || self.key_len.is_none() {
                    tracing::warn!("{OP}: nothing to reuse");
                    return Ok(ReturnCode::FAIL);
                }
            }
        }

        Ok(self.provider.any_bool_code(site::HMAC_INIT))
    }

    /// Absorb `data`
    pub fn update(&mut self, data: &[u8]) -> ModelResult<ReturnCode> {
        require(self.md.is_some(), "HmacCtx::update", "context not initialized")?;

        tracing::trace!(len = data.len(), "HmacCtx::update");
        Ok(self.provider.any_bool_code(site::HMAC_UPDATE))
    }

    /// Write the MAC to `out`
    ///
    /// # Argument
    /// * `out` - Output buffer; must hold the digest size
    pub fn final_(&mut self, out: &mut [u8]) -> ModelResult<DigestFinal> {
        const OP: &str = "HmacCtx::final_";
        let Some(md) = self.md else {
            return Err(contract_violation(OP, "no digest bound"));
        };

        let size = md.size();
        BoundedWriter::new(OP, out, size)?.write_unconstrained(
            &self.provider,
            site::HMAC_FINAL_OUTPUT,
            size,
        )?;

        let code = self.provider.any_bool_code(site::HMAC_FINAL);
        Ok(DigestFinal {
            code,
            len: code.is_success().then_some(size),
        })
    }
}

/// MAC produced by [`hmac`].
pub enum HmacOutput<'a> {
    /// Written to the caller's buffer
    Caller(&'a [u8]),
    /// Snapshot of the process-wide buffer taken when the call returned
    Static {
        /// Buffer contents
        mac: [u8; EVP_MAX_MD_SIZE],
        /// MAC length
        len: usize,
    },
}

impl Deref for HmacOutput<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            HmacOutput::Caller(mac) => mac,
            HmacOutput::Static { mac, len } => &mac[..*len],
        }
    }
}

impl fmt::Debug for HmacOutput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            HmacOutput::Caller(_) => "Caller",
            HmacOutput::Static { .. } => "Static",
        };
        f.debug_tuple(kind).field(&self.deref()).finish()
    }
}

/// One-shot keyed hash
///
/// Writes an unconstrained MAC of at most the digest size to `out`, or, when
/// `out` is `None`, to a process-wide buffer that every such call
/// overwrites. The buffer is locked only for the duration of the call and
/// the result is returned as a copy, so earlier results stay readable.
///
/// # Argument
/// * `md` - Digest; must be valid
/// * `key` - MAC key
/// * `data` - Message
/// * `out` - Output buffer; must hold the digest size
pub fn hmac<'a>(
    provider: &Provider,
    md: &EvpMd,
    key: &[u8],
    data: &[u8],
    out: Option<&'a mut [u8]>,
) -> ModelResult<HmacOutput<'a>> {
    const OP: &str = "hmac";
    require(md.is_valid(), OP, "digest is not valid")?;
    tracing::trace!(key_len = key.len(), data_len = data.len(), "{OP}");

    match out {
        Some(out) => {
            let len = BoundedWriter::new(OP, &mut *out, md.size())?
                .write_any(provider, site::HMAC_OUTPUT);
            let out: &'a [u8] = out;
            Ok(HmacOutput::Caller(&out[..len]))
        }
        None => {
            let mut buf = HMAC_STATIC_OUTPUT.lock();
            let len = BoundedWriter::new(OP, &mut buf[..], md.size())?
                .write_any(provider, site::HMAC_OUTPUT);
            Ok(HmacOutput::Static { mac: *buf, len })
        }
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;
    use crate::config::ModelConfig;
    use crate::oracle::ScriptedOracle;

    #[test]
    fn test_init_binds_key_and_digest() {
        let mut ctx = HmacCtx::new(&Provider::nominal()).unwrap();
        assert!(ctx.md().is_none());
        assert!(ctx.update(b"data").unwrap_err().is_contract_violation());

        assert_eq!(
            ctx.init_ex(Some(b"key".as_slice()), Some(EvpMd::sha256())).unwrap(),
            ReturnCode::SUCCESS
        );
        assert_eq!(ctx.md(), Some(EvpMd::sha256()));
        assert_eq!(ctx.update(b"data").unwrap(), ReturnCode::SUCCESS);

        let mut mac = [0u8; 32];
        let result = ctx.final_(&mut mac).unwrap();
        assert_eq!(result.len, Some(32));
    }

    #[test]
    fn test_reuse_rules() {
        let mut ctx = HmacCtx::new(&Provider::nominal()).unwrap();
        assert_eq!(ctx.init_ex(None, None).unwrap(), ReturnCode::FAIL);
        assert_eq!(ctx.init_ex(Some(b"key".as_slice()), None).unwrap(), ReturnCode::FAIL);
        assert_eq!(ctx.init_ex(None, Some(EvpMd::sha1())).unwrap(), ReturnCode::FAIL);

        ctx.init_ex(Some(b"key".as_slice()), Some(EvpMd::sha1())).unwrap();
        assert_eq!(ctx.init_ex(None, None).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.init_ex(None, Some(EvpMd::sha1())).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.init_ex(None, Some(EvpMd::sha512())).unwrap(), ReturnCode::FAIL);
        assert_eq!(ctx.md(), Some(EvpMd::sha1()));

        assert_eq!(ctx.init_ex(Some(b"rekey".as_slice()), None).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(
            ctx.init_ex(Some(b"new".as_slice()), Some(EvpMd::sha512())).unwrap(),
            ReturnCode::SUCCESS
        );
        assert_eq!(ctx.md(), Some(EvpMd::sha512()));
    }

    #[test]
    fn test_final_capacity_and_failure() {
        let oracle = ScriptedOracle::new().with(site::HMAC_FINAL, [1]);
        let mut ctx = HmacCtx::new(&Provider::new(ModelConfig::default(), oracle)).unwrap();
        ctx.init_ex(Some(b"key".as_slice()), Some(EvpMd::sha384())).unwrap();

        let mut short = [0u8; 32];
        assert!(ctx.final_(&mut short).unwrap_err().is_capacity_violation());

        let mut mac = [0u8; 48];
        assert_eq!(
            ctx.final_(&mut mac).unwrap(),
            DigestFinal {
                code: ReturnCode::FAIL,
                len: None
            }
        );
    }

    #[test]
    fn test_oneshot_into_caller_buffer() {
        let oracle = ScriptedOracle::new().with(site::HMAC_OUTPUT, [0, 4]);
        let provider = Provider::new(ModelConfig::default(), oracle);
        let mut buf = [0u8; EVP_MAX_MD_SIZE];

        let mac = hmac(&provider, EvpMd::sha256(), b"key", b"data", Some(&mut buf[..])).unwrap();
        assert_eq!(mac.len(), 32);
        assert!(matches!(mac, HmacOutput::Caller(_)));

        let mac = hmac(&provider, EvpMd::sha256(), b"key", b"data", Some(&mut buf[..])).unwrap();
        assert_eq!(mac.len(), 28);

        let mut short = [0u8; 16];
        let err = hmac(&provider, EvpMd::sha1(), b"key", b"data", Some(&mut short[..])).unwrap_err();
        assert!(err.is_capacity_violation());
    }

    #[test]
    fn test_oneshot_static_buffer() {
        let provider = Provider::nominal();
        {
            let mac = hmac(&provider, EvpMd::md5(), b"key", b"data", None).unwrap();
            assert_eq!(mac.len(), 16);
            assert!(matches!(mac, HmacOutput::Static { .. }));
        }

        let mac = hmac(&provider, EvpMd::sha512(), b"key", b"data", None).unwrap();
        assert_eq!(mac.len(), EVP_MAX_MD_SIZE);
    }

    #[test]
    fn test_oneshot_static_buffer_back_to_back() {
        let oracle = ScriptedOracle::new().with(site::HMAC_OUTPUT, [0, 12]);
        let provider = Provider::new(ModelConfig::default(), oracle);

        let first = hmac(&provider, EvpMd::sha256(), b"k", b"d", None).unwrap();
        let second = hmac(&provider, EvpMd::sha256(), b"k", b"d", None).unwrap();
        assert_eq!(first.len(), 32);
        assert_eq!(second.len(), 20);
        assert!(matches!(second, HmacOutput::Static { .. }));
    }
}
