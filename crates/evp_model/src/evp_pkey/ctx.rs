// Copyright (C) Microsoft Corporation. All rights reserved.

use super::padding::RsaPadding;
use super::pkey::EvpPKey;
use crate::buffer::BoundedWriter;
use crate::error::require;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::evp_md::md::EvpMd;
use crate::oracle::site;
use crate::provider::Provider;

/// Key type wildcard accepted by [`EvpPKeyCtx::ctrl`].
pub const ANY_KEY_TYPE: i32 = -1;

/// Purpose an asymmetric context is initialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    /// No successful init yet
    #[default]
    Uninitialized,
    /// `EVP_PKEY_sign_init`
    Sign,
    /// `EVP_PKEY_derive_init`
    Derive,
    /// `EVP_PKEY_encrypt_init`
    Encrypt,
    /// `EVP_PKEY_decrypt_init`
    Decrypt,
}

/// Result of a sizing-protocol call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PKeyOutput {
    /// Return code of the call
    pub code: ReturnCode,
    /// Maximum size (no buffer) or bytes written (buffer); `None` whenever
    /// `code` is not success, as the length is unreliable then
    pub len: Option<usize>,
}

impl PKeyOutput {
    fn failed(code: ReturnCode) -> Self {
        Self { code, len: None }
    }

    fn succeeded(len: usize) -> Self {
        Self {
            code: ReturnCode::SUCCESS,
            len: Some(len),
        }
    }
}

/// Asymmetric operation context (`EVP_PKEY_CTX`).
///
/// Holds a reference to its key for its whole lifetime. The active purpose
/// is a single [`Operation`], so a context can never be initialized for two
/// purposes at once.
#[derive(Debug)]
pub struct EvpPKeyCtx {
    provider: Provider,
    pkey: Option<EvpPKey>,
    id: Option<i32>,
    operation: Operation,
    rsa_padding: Option<RsaPadding>,
    oaep_md: Option<EvpMd>,
    mgf1_md: Option<EvpMd>,
}

impl EvpPKeyCtx {
    /// Create a new context bound to a key
    ///
    /// # Argument
    /// * `key` - Key to operate on; the context takes a reference to it
    ///
    /// # Return
    /// Contract violation if the key is not valid
    pub fn new(key: &EvpPKey) -> ModelResult<Self> {
        require(key.is_valid(), "EvpPKeyCtx::new", "key is not valid")?;
        let provider = key.provider().clone();
        provider.allocate("EvpPKeyCtx")?;

        Ok(Self::with_parts(provider, Some(key.up_ref()), None))
    }

    /// Create a new context from an algorithm id, with no key bound
    pub fn new_id(provider: &Provider, id: i32) -> ModelResult<Self> {
        provider.allocate("EvpPKeyCtx")?;
        Ok(Self::with_parts(provider.clone(), None, Some(id)))
    }

    fn with_parts(provider: Provider, pkey: Option<EvpPKey>, id: Option<i32>) -> Self {
        Self {
            provider,
            pkey,
            id,
            operation: Operation::Uninitialized,
            rsa_padding: None,
            oaep_md: None,
            mgf1_md: None,
        }
    }

    /// Duplicate the context, taking another reference to its key
    pub fn dup(&self) -> ModelResult<Self> {
        self.provider.allocate("EvpPKeyCtx")?;

        Ok(Self {
            provider: self.provider.clone(),
            pkey: self.pkey.as_ref().map(EvpPKey::up_ref),
            id: self.id,
            operation: self.operation,
            rsa_padding: self.rsa_padding,
            oaep_md: self.oaep_md,
            mgf1_md: self.mgf1_md,
        })
    }

    /// Bound key, if any.
    pub fn pkey(&self) -> Option<&EvpPKey> {
        self.pkey.as_ref()
    }

    /// Algorithm id the context was created from, if any.
    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Currently initialized purpose.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Selected RSA padding mode.
    pub fn rsa_padding(&self) -> Option<RsaPadding> {
        self.rsa_padding
    }

    /// Selected OAEP digest.
    pub fn rsa_oaep_md(&self) -> Option<&EvpMd> {
        self.oaep_md.as_ref()
    }

    /// Selected MGF1 digest.
    pub fn rsa_mgf1_md(&self) -> Option<&EvpMd> {
        self.mgf1_md.as_ref()
    }

    /// Context is usable: its key, if any, is valid.
    pub fn is_valid(&self) -> bool {
        self.pkey.as_ref().map_or(true, EvpPKey::is_valid)
    }

    /// Release the context and its key reference.
    pub fn free(self) {
        tracing::trace!(operation = ?self.operation, "EvpPKeyCtx::free");
    }

    fn init(
        &mut self,
        op: &'static str,
        site: &'static str,
        purpose: Operation,
        needs_key: bool,
    ) -> ModelResult<ReturnCode> {
        if needs_key {
            require(
                self.pkey.as_ref().is_some_and(EvpPKey::is_valid),
                op,
                "no valid key bound",
            )?;
        }

        let code = self.provider.any_code(site);
        self.operation = if code.is_success() {
            purpose
        } else {
            tracing::debug!(%code, "{op}: init failed");
            Operation::Uninitialized
        };
        Ok(code)
    }

    /// Initialize for signing
    ///
    /// # Return
    /// 1 on success, 0 on failure, negative if signing is not supported
    pub fn sign_init(&mut self) -> ModelResult<ReturnCode> {
        self.init(
            "EvpPKeyCtx::sign_init",
            site::PKEY_SIGN_INIT,
            Operation::Sign,
            true,
        )
    }

    /// Initialize for key derivation
    pub fn derive_init(&mut self) -> ModelResult<ReturnCode> {
        self.init(
            "EvpPKeyCtx::derive_init",
            site::PKEY_DERIVE_INIT,
            Operation::Derive,
            false,
        )
    }

    /// Initialize for encryption
    pub fn encrypt_init(&mut self) -> ModelResult<ReturnCode> {
        self.init(
            "EvpPKeyCtx::encrypt_init",
            site::PKEY_ENCRYPT_INIT,
            Operation::Encrypt,
            true,
        )
    }

    /// Initialize for decryption
    pub fn decrypt_init(&mut self) -> ModelResult<ReturnCode> {
        self.init(
            "EvpPKeyCtx::decrypt_init",
            site::PKEY_DECRYPT_INIT,
            Operation::Decrypt,
            true,
        )
    }

    /// Sign `tbs`
    ///
    /// Called without a buffer it reports the maximum signature size. Called
    /// with a buffer, the buffer must hold at least that maximum; an
    /// unconstrained signature of at most the maximum is written.
    ///
    /// # Argument
    /// * `sig` - Output buffer, or `None` to query the size
    /// * `tbs` - Data to be signed
    pub fn sign(&mut self, sig: Option<&mut [u8]>, tbs: &[u8]) -> ModelResult<PKeyOutput> {
        const OP: &str = "EvpPKeyCtx::sign";
        require(self.operation == Operation::Sign, OP, "not initialized for signing")?;

        let max = self.provider.config().size_limits.signature;
        let writer = match sig {
            Some(sig) => Some(BoundedWriter::new(OP, sig, max)?),
            None => None,
        };

        if !self.provider.succeeds(site::PKEY_SIGN) {
            let code = self.provider.any_failure_code(site::PKEY_SIGN);
            tracing::debug!(%code, tbs_len = tbs.len(), "EvpPKeyCtx::sign: failed");
            return Ok(PKeyOutput::failed(code));
        }

        Ok(match writer {
            Some(writer) => PKeyOutput::succeeded(writer.write_any(&self.provider, site::PKEY_SIGN_OUTPUT)),
            None => PKeyOutput::succeeded(max),
        })
    }

    /// Derive the shared secret
    ///
    /// Without a buffer the maximum secret size is reported. With a buffer,
    /// at most `min(buffer length, maximum)` bytes are written.
    pub fn derive(&mut self, key: Option<&mut [u8]>) -> ModelResult<PKeyOutput> {
        const OP: &str = "EvpPKeyCtx::derive";
        require(self.operation == Operation::Derive, OP, "not initialized for derivation")?;

        let max = self.provider.config().size_limits.derivation;
        self.sized_output(OP, site::PKEY_DERIVE, site::PKEY_DERIVE_OUTPUT, max, key)
    }

    /// Encrypt `input`
    pub fn encrypt(&mut self, out: Option<&mut [u8]>, input: &[u8]) -> ModelResult<PKeyOutput> {
        const OP: &str = "EvpPKeyCtx::encrypt";
        require(self.operation == Operation::Encrypt, OP, "not initialized for encryption")?;

        tracing::trace!(input_len = input.len(), "{OP}");
        let max = self.provider.config().size_limits.encryption;
        self.sized_output(OP, site::PKEY_ENCRYPT, site::PKEY_ENCRYPT_OUTPUT, max, out)
    }

    /// Decrypt `input`
    pub fn decrypt(&mut self, out: Option<&mut [u8]>, input: &[u8]) -> ModelResult<PKeyOutput> {
        const OP: &str = "EvpPKeyCtx::decrypt";
        require(self.operation == Operation::Decrypt, OP, "not initialized for decryption")?;

        tracing::trace!(input_len = input.len(), "{OP}");
        let max = self.provider.config().size_limits.decryption;
        self.sized_output(OP, site::PKEY_DECRYPT, site::PKEY_DECRYPT_OUTPUT, max, out)
    }

    fn sized_output(
        &self,
        op: &'static str,
        outcome_site: &'static str,
        output_site: &'static str,
        max: usize,
        out: Option<&mut [u8]>,
    ) -> ModelResult<PKeyOutput> {
        if !self.provider.succeeds(outcome_site) {
            let code = self.provider.any_failure_code(outcome_site);
            tracing::debug!(%code, "{op}: failed");
            return Ok(PKeyOutput::failed(code));
        }

        Ok(match out {
            Some(out) => {
                let bound = out.len().min(max);
                let writer = BoundedWriter::new(op, out, bound)?;
                PKeyOutput::succeeded(writer.write_any(&self.provider, output_site))
            }
            None => PKeyOutput::succeeded(max),
        })
    }

    /// Select the RSA padding mode
    ///
    /// # Argument
    /// * `pad` - Raw padding mode; unknown values are a contract violation,
    ///   and X9.31 requires the context to be initialized for signing
    ///
    /// The mode is recorded whatever the engine returns.
    ///
    /// # Return
    /// 1 or 0
    pub fn set_rsa_padding(&mut self, pad: i32) -> ModelResult<ReturnCode> {
        const OP: &str = "EvpPKeyCtx::set_rsa_padding";
        let padding = RsaPadding::try_from(pad)?;
        if padding == RsaPadding::X931 {
            require(
                self.operation == Operation::Sign,
                OP,
                "X9.31 padding requires signing",
            )?;
        }

        self.rsa_padding = Some(padding);
        Ok(self.provider.any_bool_code(site::PKEY_SET_RSA_PADDING))
    }

    /// Select the OAEP digest; requires OAEP padding
    pub fn set_rsa_oaep_md(&mut self, md: &EvpMd) -> ModelResult<ReturnCode> {
        require(
            self.rsa_padding == Some(RsaPadding::Pkcs1Oaep),
            "EvpPKeyCtx::set_rsa_oaep_md",
            "padding is not OAEP",
        )?;

        let code = self.provider.any_bool_code(site::PKEY_SET_RSA_OAEP_MD);
        if code.is_success() {
            self.oaep_md = Some(*md);
        }
        Ok(code)
    }

    /// Select the MGF1 digest; requires OAEP or PSS padding
    pub fn set_rsa_mgf1_md(&mut self, md: &EvpMd) -> ModelResult<ReturnCode> {
        require(
            matches!(
                self.rsa_padding,
                Some(RsaPadding::Pkcs1Oaep | RsaPadding::Pkcs1Pss)
            ),
            "EvpPKeyCtx::set_rsa_mgf1_md",
            "padding is neither OAEP nor PSS",
        )?;

        let code = self.provider.any_bool_code(site::PKEY_SET_RSA_MGF1_MD);
        if code.is_success() {
            self.mgf1_md = Some(*md);
        }
        Ok(code)
    }

    /// Generic control dispatch
    ///
    /// # Argument
    /// * `keytype` - Must be [`ANY_KEY_TYPE`]
    /// * `optype` - Operation mask the command applies to
    /// * `cmd` - Control command
    /// * `p1` - Integer argument
    pub fn ctrl(&mut self, keytype: i32, optype: i32, cmd: i32, p1: i32) -> ModelResult<ReturnCode> {
        require(
            keytype == ANY_KEY_TYPE,
            "EvpPKeyCtx::ctrl",
            "key type must be -1",
        )?;

        tracing::trace!(optype, cmd, p1, "EvpPKeyCtx::ctrl");
        Ok(self.provider.any_code(site::PKEY_CTRL))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_with_tracing::test;

    use super::*;
    use crate::config::ModelConfig;
    use crate::error::ModelError;
    use crate::evp_pkey::ec_key::EcCurve;
    use crate::evp_pkey::ec_key::EcKey;
    use crate::evp_pkey::ec_key::KeyCapability;
    use crate::oracle::ScriptedOracle;

    fn key_with(provider: &Provider) -> (EvpPKey, Rc<EcKey>) {
        let key = EvpPKey::new(provider).unwrap();
        let ec = Rc::new(EcKey::new(EcCurve::P256));
        let capability: Rc<dyn KeyCapability> = ec.clone();
        assert_eq!(key.set1_ec_key(Some(&capability)), ReturnCode::SUCCESS);
        (key, ec)
    }

    #[test]
    fn test_ctx_holds_key_reference() {
        let (key, _ec) = key_with(&Provider::nominal());
        let ctx = EvpPKeyCtx::new(&key).unwrap();
        assert_eq!(key.reference_count(), 2);
        assert!(ctx.pkey().is_some_and(|pkey| pkey.ptr_eq(&key)));

        let dup = ctx.dup().unwrap();
        assert_eq!(key.reference_count(), 3);

        ctx.free();
        drop(dup);
        assert_eq!(key.reference_count(), 1);
    }

    #[test]
    fn test_new_requires_valid_key() {
        let (key, ec) = key_with(&Provider::nominal());
        ec.invalidate();
        let err = EvpPKeyCtx::new(&key).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(key.reference_count(), 1);
    }

    #[test]
    fn test_init_failure_leaves_uninitialized() {
        let oracle = ScriptedOracle::new().with(site::PKEY_SIGN_INIT, [3, 1]);
        let provider = Provider::new(ModelConfig::default(), oracle);
        let (key, _ec) = key_with(&provider);
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();

        assert_eq!(ctx.sign_init().unwrap(), ReturnCode::NOT_SUPPORTED);
        assert_eq!(ctx.operation(), Operation::Uninitialized);
        assert_eq!(ctx.sign_init().unwrap(), ReturnCode::FAIL);
        assert_eq!(ctx.sign_init().unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.operation(), Operation::Sign);
    }

    #[test]
    fn test_sign_requires_init() {
        let (key, _ec) = key_with(&Provider::nominal());
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();
        assert!(ctx.sign(None, b"tbs").unwrap_err().is_contract_violation());

        ctx.derive_init().unwrap();
        assert!(ctx.sign(None, b"tbs").unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_sign_two_phase() {
        let (key, _ec) = key_with(&Provider::nominal());
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();
        ctx.sign_init().unwrap();

        let query = ctx.sign(None, b"tbs").unwrap();
        assert_eq!(query, PKeyOutput::succeeded(72));

        let mut sig = vec![0u8; 72];
        let output = ctx.sign(Some(&mut sig[..]), b"tbs").unwrap();
        assert_eq!(output.code, ReturnCode::SUCCESS);
        assert!(output.len.is_some_and(|len| len <= 72));

        let mut short = vec![0u8; 71];
        let err = ctx.sign(Some(&mut short[..]), b"tbs").unwrap_err();
        assert_eq!(
            err,
            ModelError::CapacityViolation {
                op: "EvpPKeyCtx::sign",
                required: 72,
                available: 71,
            }
        );
    }

    #[test]
    fn test_sign_failure_has_no_length() {
        let oracle = ScriptedOracle::new().with(site::PKEY_SIGN, [1, 1]);
        let provider = Provider::new(ModelConfig::default(), oracle);
        let (key, _ec) = key_with(&provider);
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();
        ctx.sign_init().unwrap();

        let mut sig = vec![0u8; 72];
        let output = ctx.sign(Some(&mut sig[..]), b"tbs").unwrap();
        assert_eq!(output.code, ReturnCode::ERROR);
        assert_eq!(output.len, None);
    }

    #[test]
    fn test_derive_bounded_by_buffer() {
        let provider = Provider::nominal();
        let mut ctx = EvpPKeyCtx::new_id(&provider, 1034).unwrap();
        assert_eq!(ctx.id(), Some(1034));
        assert_eq!(ctx.derive_init().unwrap(), ReturnCode::SUCCESS);

        assert_eq!(ctx.derive(None).unwrap().len, Some(32));
        let mut secret = [0u8; 16];
        assert_eq!(ctx.derive(Some(&mut secret[..])).unwrap().len, Some(16));
    }

    #[test]
    fn test_encrypt_decrypt_need_key() {
        let mut ctx = EvpPKeyCtx::new_id(&Provider::nominal(), 6).unwrap();
        assert!(ctx.encrypt_init().unwrap_err().is_contract_violation());
        assert!(ctx.decrypt_init().unwrap_err().is_contract_violation());
        assert!(ctx.sign_init().unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_encrypt_then_decrypt_sizes() {
        let (key, _ec) = key_with(&Provider::nominal());
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();

        ctx.encrypt_init().unwrap();
        assert_eq!(ctx.encrypt(None, b"msg").unwrap().len, Some(512));
        let mut out = vec![0u8; 600];
        assert_eq!(ctx.encrypt(Some(&mut out[..]), b"msg").unwrap().len, Some(512));
        assert!(ctx.decrypt(None, b"msg").unwrap_err().is_contract_violation());

        ctx.decrypt_init().unwrap();
        assert_eq!(ctx.operation(), Operation::Decrypt);
        let mut out = vec![0u8; 10];
        assert_eq!(ctx.decrypt(Some(&mut out[..]), b"ct").unwrap().len, Some(10));
    }

    #[test]
    fn test_rsa_padding_rules() {
        let (key, _ec) = key_with(&Provider::nominal());
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();

        assert!(ctx.set_rsa_padding(7).unwrap_err().is_contract_violation());
        assert!(ctx.set_rsa_padding(5).unwrap_err().is_contract_violation());
        assert!(ctx
            .set_rsa_oaep_md(EvpMd::sha256())
            .unwrap_err()
            .is_contract_violation());

        assert_eq!(ctx.set_rsa_padding(6).unwrap(), ReturnCode::SUCCESS);
        assert!(ctx
            .set_rsa_oaep_md(EvpMd::sha256())
            .unwrap_err()
            .is_contract_violation());
        assert_eq!(ctx.set_rsa_mgf1_md(EvpMd::sha1()).unwrap(), ReturnCode::SUCCESS);

        assert_eq!(ctx.set_rsa_padding(4).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.set_rsa_oaep_md(EvpMd::sha256()).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.rsa_oaep_md(), Some(EvpMd::sha256()));
        assert_eq!(ctx.rsa_mgf1_md(), Some(EvpMd::sha1()));

        ctx.sign_init().unwrap();
        assert_eq!(ctx.set_rsa_padding(5).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.rsa_padding(), Some(RsaPadding::X931));
    }

    #[test]
    fn test_rsa_padding_recorded_on_failure() {
        let oracle = ScriptedOracle::new().with(site::PKEY_SET_RSA_PADDING, [0, 1]);
        let provider = Provider::new(ModelConfig::default(), oracle);
        let (key, _ec) = key_with(&provider);
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();

        assert_eq!(ctx.set_rsa_padding(1).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.set_rsa_padding(4).unwrap(), ReturnCode::FAIL);
        assert_eq!(ctx.rsa_padding(), Some(RsaPadding::Pkcs1Oaep));
        assert_eq!(ctx.set_rsa_oaep_md(EvpMd::sha256()).unwrap(), ReturnCode::SUCCESS);
    }

    #[test]
    fn test_ctrl_key_type() {
        let (key, _ec) = key_with(&Provider::nominal());
        let mut ctx = EvpPKeyCtx::new(&key).unwrap();
        assert!(ctx.ctrl(408, -1, 1, 0).unwrap_err().is_contract_violation());
        assert_eq!(ctx.ctrl(ANY_KEY_TYPE, -1, 1, 0).unwrap(), ReturnCode::SUCCESS);
    }
}
