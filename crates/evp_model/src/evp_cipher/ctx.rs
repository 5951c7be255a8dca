// Copyright (C) Microsoft Corporation. All rights reserved.

use super::cipher::EvpCipher;
use crate::buffer::BoundedWriter;
use crate::error::contract_violation;
use crate::error::require;
use crate::error::require_capacity;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::oracle::site;
use crate::provider::Provider;

/// `EVP_CTRL_AEAD_SET_IVLEN`
pub const EVP_CTRL_AEAD_SET_IVLEN: i32 = 0x9;
/// `EVP_CTRL_AEAD_GET_TAG`
pub const EVP_CTRL_AEAD_GET_TAG: i32 = 0x10;
/// `EVP_CTRL_AEAD_SET_TAG`
pub const EVP_CTRL_AEAD_SET_TAG: i32 = 0x11;

/// Direction a cipher context runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// No direction chosen yet
    #[default]
    Unset,
    /// Encrypting
    Encrypt,
    /// Decrypting
    Decrypt,
}

impl Direction {
    /// Interpret the `enc` argument of `EVP_CipherInit_ex`
    ///
    /// # Return
    /// `Some` direction for 1 and 0, `None` (keep the current one) for -1,
    /// and a contract violation for anything else
    pub fn from_enc(enc: i32) -> ModelResult<Option<Direction>> {
        match enc {
            1 => Ok(Some(Direction::Encrypt)),
            0 => Ok(Some(Direction::Decrypt)),
            -1 => Ok(None),
            _ => Err(contract_violation(
                "Direction::from_enc",
                format!("enc must be 1, 0 or -1, got {enc}"),
            )),
        }
    }
}

/// Typed form of the cipher control commands.
#[derive(Debug)]
pub enum CipherCtrl<'a> {
    /// Set the IV length before the IV is supplied
    SetIvLen(i32),
    /// Copy `len` bytes of tag into the buffer
    GetTag(&'a mut [u8], usize),
    /// Provide the expected tag of `len` bytes
    SetTag(&'a [u8], usize),
    /// Any other command
    Other {
        /// Raw command
        cmd: i32,
        /// Integer argument
        arg: i32,
    },
}

impl CipherCtrl<'_> {
    /// Raw command code.
    pub fn cmd(&self) -> i32 {
        match self {
            CipherCtrl::SetIvLen(_) => EVP_CTRL_AEAD_SET_IVLEN,
            CipherCtrl::GetTag(..) => EVP_CTRL_AEAD_GET_TAG,
            CipherCtrl::SetTag(..) => EVP_CTRL_AEAD_SET_TAG,
            CipherCtrl::Other { cmd, .. } => *cmd,
        }
    }
}

/// Result of an update or final call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherOutput {
    /// Return code of the call
    pub code: ReturnCode,
    /// Bytes written; `None` on failure and for AAD updates
    pub len: Option<usize>,
}

impl CipherOutput {
    fn failed(code: ReturnCode) -> Self {
        Self { code, len: None }
    }
}

/// Symmetric cipher context (`EVP_CIPHER_CTX`).
///
/// Moves from created, to a direction being set, to an IV being supplied,
/// through any number of updates to a terminal final. The IV length is
/// fixed once the IV is set, the tag can be read only after an encrypting
/// final, and set only while decrypting.
#[derive(Debug)]
pub struct EvpCipherCtx {
    provider: Provider,
    direction: Direction,
    cipher: Option<&'static EvpCipher>,
    iv_len: usize,
    iv_set: bool,
    key_len: usize,
    padding: bool,
    data_processed: bool,
    data_remaining: usize,
}

impl EvpCipherCtx {
    pub fn new(provider: &Provider) -> ModelResult<Self> {
        provider.allocate("EvpCipherCtx")?;

        let config = provider.config();
        Ok(Self {
            provider: provider.clone(),
            direction: Direction::Unset,
            cipher: None,
            iv_len: config.default_iv_len,
            iv_set: false,
            key_len: config.default_key_len,
            padding: true,
            data_processed: false,
            data_remaining: 0,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_encrypting(&self) -> bool {
        self.direction == Direction::Encrypt
    }

    pub fn cipher(&self) -> Option<&'static EvpCipher> {
        self.cipher
    }

    pub fn nid(&self) -> Option<i32> {
        self.cipher.map(EvpCipher::nid)
    }

    pub fn iv_len(&self) -> usize {
        self.iv_len
    }

    pub fn iv_set(&self) -> bool {
        self.iv_set
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn padding(&self) -> bool {
        self.padding
    }

    pub fn data_processed(&self) -> bool {
        self.data_processed
    }

    pub fn data_remaining(&self) -> usize {
        self.data_remaining
    }

    /// Initialize the context
    ///
    /// # Argument
    /// * `cipher` - Cipher to bind, or `None` to keep the current one
    /// * `key` - Key material, or `None`
    /// * `iv` - IV material; supplying it fixes the IV length
    /// * `enc` - 1 to encrypt, 0 to decrypt, -1 to keep the direction
    ///
    /// # Return
    /// 1 or 0
    pub fn init(
        &mut self,
        cipher: Option<&'static EvpCipher>,
        key: Option<&[u8]>,
        iv: Option<&[u8]>,
        enc: i32,
    ) -> ModelResult<ReturnCode> {
        let direction = Direction::from_enc(enc)?;
        self.apply_init(cipher, key, iv, direction);
        Ok(self.provider.any_bool_code(site::CIPHER_INIT))
    }

    /// Initialize for encryption
    pub fn encrypt_init(
        &mut self,
        cipher: Option<&'static EvpCipher>,
        key: Option<&[u8]>,
        iv: Option<&[u8]>,
    ) -> ModelResult<ReturnCode> {
        self.apply_init(cipher, key, iv, Some(Direction::Encrypt));
        Ok(self.provider.any_bool_code(site::CIPHER_INIT))
    }

    /// Initialize for decryption; a cipher must be supplied
    pub fn decrypt_init(
        &mut self,
        cipher: Option<&'static EvpCipher>,
        key: Option<&[u8]>,
        iv: Option<&[u8]>,
    ) -> ModelResult<ReturnCode> {
        require(
            cipher.is_some(),
            "EvpCipherCtx::decrypt_init",
            "cipher is required",
        )?;

        self.apply_init(cipher, key, iv, Some(Direction::Decrypt));
        Ok(self.provider.any_bool_code(site::CIPHER_INIT))
    }

    fn apply_init(
        &mut self,
        cipher: Option<&'static EvpCipher>,
        key: Option<&[u8]>,
        iv: Option<&[u8]>,
        direction: Option<Direction>,
    ) {
        if let Some(direction) = direction {
            self.direction = direction;
        }
        if let Some(cipher) = cipher {
            self.cipher = Some(cipher);
            self.key_len = cipher.key_len();
            if !self.iv_set && cipher.iv_len() > 0 {
                self.iv_len = cipher.iv_len();
            }
        }
        if let Some(key) = key {
            tracing::trace!(key_len = key.len(), "EvpCipherCtx::init: key supplied");
        }
        if iv.is_some() {
            self.iv_set = true;
        }
    }

    /// Enable or disable padding
    pub fn set_padding(&mut self, padding: bool) -> ReturnCode {
        self.padding = padding;
        ReturnCode::SUCCESS
    }

    /// Set the IV length; only before the IV is supplied
    pub fn set_iv_len(&mut self, len: i32) -> ModelResult<ReturnCode> {
        const OP: &str = "EvpCipherCtx::set_iv_len";
        require(!self.iv_set, OP, "IV already set")?;
        require(len > 0, OP, "IV length must be positive")?;

        let code = self.provider.any_bool_code(site::CIPHER_SET_IV_LEN);
        if code.is_success() {
            self.iv_len = len as usize;
        }
        Ok(code)
    }

    /// Read the authentication tag
    ///
    /// Legal only when encrypting and after the final call.
    ///
    /// # Argument
    /// * `tag` - Output buffer; must hold `len` bytes
    /// * `len` - Tag length requested
    pub fn get_tag(&mut self, tag: &mut [u8], len: usize) -> ModelResult<ReturnCode> {
        const OP: &str = "EvpCipherCtx::get_tag";
        require(self.direction == Direction::Encrypt, OP, "context is not encrypting")?;
        require(self.data_processed, OP, "final has not run")?;
        let writer = BoundedWriter::new(OP, tag, len)?;

        let code = self.provider.any_bool_code(site::CIPHER_GET_TAG);
        if code.is_success() {
            writer.write_unconstrained(&self.provider, site::CIPHER_GET_TAG_OUTPUT, len)?;
        }
        Ok(code)
    }

    /// Provide the expected authentication tag; legal only when decrypting
    ///
    /// # Argument
    /// * `tag` - Tag bytes; must hold `len` bytes
    /// * `len` - Tag length
    pub fn set_tag(&mut self, tag: &[u8], len: usize) -> ModelResult<ReturnCode> {
        const OP: &str = "EvpCipherCtx::set_tag";
        require(self.direction == Direction::Decrypt, OP, "context is not decrypting")?;
        require_capacity(OP, len, tag.len())?;

        Ok(self.provider.any_bool_code(site::CIPHER_SET_TAG))
    }

    /// Dispatch a control command
    ///
    /// The AEAD commands carry preconditions and are accepted only in their
    /// typed form; passing their codes through [`CipherCtrl::Other`] is a
    /// contract violation.
    pub fn ctrl(&mut self, ctrl: CipherCtrl<'_>) -> ModelResult<ReturnCode> {
        match ctrl {
            CipherCtrl::SetIvLen(len) => self.set_iv_len(len),
            CipherCtrl::GetTag(tag, len) => self.get_tag(tag, len),
            CipherCtrl::SetTag(tag, len) => self.set_tag(tag, len),
            CipherCtrl::Other { cmd, arg } => {
                require(
                    !matches!(
                        cmd,
                        EVP_CTRL_AEAD_SET_IVLEN | EVP_CTRL_AEAD_GET_TAG | EVP_CTRL_AEAD_SET_TAG
                    ),
                    "EvpCipherCtx::ctrl",
                    "AEAD command must use its typed form",
                )?;
                tracing::trace!(cmd, arg, "EvpCipherCtx::ctrl");
                Ok(self.provider.any_bool_code(site::CIPHER_CTRL))
            }
        }
    }

    /// Process `input`
    ///
    /// With `out` set to `None` the input is additional authenticated data
    /// and only the return code matters. Otherwise a bound cipher withholds
    /// at least one byte when encrypting, and the raw mode may buffer part of
    /// the input for the final call.
    ///
    /// # Argument
    /// * `out` - Output buffer; must hold the largest amount the call may
    ///   write
    /// * `input` - Input bytes
    pub fn update(&mut self, out: Option<&mut [u8]>, input: &[u8]) -> ModelResult<CipherOutput> {
        const OP: &str = "EvpCipherCtx::update";
        require(self.direction != Direction::Unset, OP, "no direction set")?;
        require(!self.data_processed, OP, "final has already run")?;

        let Some(out) = out else {
            let code = self.provider.any_bool_code(site::CIPHER_UPDATE);
            tracing::trace!(aad_len = input.len(), %code, "{OP}: AAD");
            return Ok(CipherOutput { code, len: None });
        };

        let max = match (self.cipher.is_some(), self.direction) {
            (true, Direction::Encrypt) => input.len().saturating_sub(1),
            (true, _) if self.padding => input.len(),
            (true, _) => out.len(),
            (false, _) => input.len(),
        };
        let writer = BoundedWriter::new(OP, out, max)?;

        if !self.provider.succeeds(site::CIPHER_UPDATE) {
            return Ok(CipherOutput::failed(ReturnCode::FAIL));
        }

        let written = writer.write_any(&self.provider, site::CIPHER_UPDATE_OUTPUT);
        if self.cipher.is_none() {
            self.data_remaining = input.len() - written;
        }
        Ok(CipherOutput {
            code: ReturnCode::SUCCESS,
            len: Some(written),
        })
    }

    /// Finish the operation
    ///
    /// With padding enabled the bytes still buffered are written to `out`.
    /// The context is terminal afterwards.
    pub fn final_(&mut self, out: &mut [u8]) -> ModelResult<CipherOutput> {
        const OP: &str = "EvpCipherCtx::final_";
        require(self.direction != Direction::Unset, OP, "no direction set")?;

        let written = if self.padding {
            let remaining = self.data_remaining;
            BoundedWriter::new(OP, out, remaining)?.write_unconstrained(
                &self.provider,
                site::CIPHER_FINAL_OUTPUT,
                remaining,
            )?
        } else {
            0
        };
        self.data_processed = true;

        let code = self.provider.any_bool_code(site::CIPHER_FINAL);
        if !code.is_success() {
            return Ok(CipherOutput::failed(code));
        }
        Ok(CipherOutput {
            code,
            len: Some(written),
        })
    }

    /// Release the context.
    pub fn free(self) {
        tracing::trace!(direction = ?self.direction, "EvpCipherCtx::free");
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;
    use crate::config::ModelConfig;
    use crate::oracle::ScriptedOracle;

    const KEY: [u8; 32] = [7u8; 32];
    const IV: [u8; 12] = [1u8; 12];

    #[test]
    fn test_new_ctx_defaults() {
        let ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        assert_eq!(ctx.direction(), Direction::Unset);
        assert!(ctx.cipher().is_none());
        assert_eq!(ctx.iv_len(), 12);
        assert_eq!(ctx.key_len(), 32);
        assert!(!ctx.iv_set());
        assert!(ctx.padding());
        assert!(!ctx.data_processed());
        assert_eq!(ctx.data_remaining(), 0);
    }

    #[test]
    fn test_direction_from_enc() {
        assert_eq!(Direction::from_enc(1).unwrap(), Some(Direction::Encrypt));
        assert_eq!(Direction::from_enc(0).unwrap(), Some(Direction::Decrypt));
        assert_eq!(Direction::from_enc(-1).unwrap(), None);
        assert!(Direction::from_enc(2).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_init_keeps_direction_on_minus_one() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.init(Some(EvpCipher::aes_128_gcm()), None, None, 1).unwrap();
        assert_eq!(ctx.direction(), Direction::Encrypt);
        assert_eq!(ctx.key_len(), 16);
        assert_eq!(ctx.nid(), Some(895));

        ctx.init(None, Some(&KEY), Some(&IV), -1).unwrap();
        assert_eq!(ctx.direction(), Direction::Encrypt);
        assert!(ctx.iv_set());
        assert!(std::ptr::eq(ctx.cipher().unwrap(), EvpCipher::aes_128_gcm()));
    }

    #[test]
    fn test_iv_len_before_iv_only() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.encrypt_init(Some(EvpCipher::aes_256_gcm()), None, None).unwrap();
        assert!(ctx.set_iv_len(0).unwrap_err().is_contract_violation());
        assert_eq!(ctx.set_iv_len(16).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(ctx.iv_len(), 16);

        ctx.encrypt_init(None, Some(&KEY), Some(&IV)).unwrap();
        assert_eq!(ctx.iv_len(), 16);
        assert!(ctx
            .ctrl(CipherCtrl::SetIvLen(12))
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn test_decrypt_init_requires_cipher() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        assert!(ctx
            .decrypt_init(None, Some(&KEY), Some(&IV))
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn test_update_requires_direction() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        let mut out = [0u8; 16];
        assert!(ctx
            .update(Some(&mut out[..]), b"data")
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn test_encrypt_update_withholds_a_byte() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.encrypt_init(Some(EvpCipher::aes_256_gcm()), Some(&KEY), Some(&IV))
            .unwrap();

        let aad = ctx.update(None, b"header").unwrap();
        assert_eq!(aad.code, ReturnCode::SUCCESS);
        assert_eq!(aad.len, None);

        let mut out = [0u8; 16];
        let output = ctx.update(Some(&mut out[..]), &[0u8; 16]).unwrap();
        assert_eq!(output.len, Some(15));

        let mut small = [0u8; 8];
        assert!(ctx
            .update(Some(&mut small[..]), &[0u8; 16])
            .unwrap_err()
            .is_capacity_violation());

        let output = ctx.update(Some(&mut out[..]), &[]).unwrap();
        assert_eq!(output.len, Some(0));
    }

    #[test]
    fn test_decrypt_update_bounds() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.decrypt_init(Some(EvpCipher::aes_128_ecb()), Some(&KEY), None)
            .unwrap();

        let mut out = [0u8; 32];
        assert_eq!(ctx.update(Some(&mut out[..]), &[0u8; 32]).unwrap().len, Some(32));

        ctx.set_padding(false);
        assert_eq!(ctx.update(Some(&mut out[..8]), &[0u8; 32]).unwrap().len, Some(8));
    }

    #[test]
    fn test_raw_mode_tracks_remaining() {
        let oracle = ScriptedOracle::new().with(site::CIPHER_UPDATE_OUTPUT, [3]);
        let mut ctx = EvpCipherCtx::new(&Provider::new(ModelConfig::default(), oracle)).unwrap();
        ctx.init(None, None, None, 1).unwrap();

        let mut out = [0u8; 10];
        assert_eq!(ctx.update(Some(&mut out[..]), &[0u8; 10]).unwrap().len, Some(7));
        assert_eq!(ctx.data_remaining(), 3);

        let mut short = [0u8; 2];
        assert!(ctx.final_(&mut short).unwrap_err().is_capacity_violation());

        let mut tail = [0u8; 3];
        assert_eq!(ctx.final_(&mut tail).unwrap().len, Some(3));
        assert!(ctx.data_processed());
    }

    #[test]
    fn test_final_is_terminal() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.encrypt_init(Some(EvpCipher::aes_128_gcm()), Some(&KEY), Some(&IV))
            .unwrap();
        let mut out = [0u8; 0];
        assert_eq!(ctx.final_(&mut out).unwrap().len, Some(0));

        let mut buf = [0u8; 16];
        assert!(ctx
            .update(Some(&mut buf[..]), b"late")
            .unwrap_err()
            .is_contract_violation());
    }

    #[test]
    fn test_get_tag_rules() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.encrypt_init(Some(EvpCipher::aes_128_gcm()), Some(&KEY), Some(&IV))
            .unwrap();

        let mut tag = [0u8; 16];
        assert!(ctx.get_tag(&mut tag, 16).unwrap_err().is_contract_violation());

        ctx.final_(&mut []).unwrap();
        assert!(ctx.get_tag(&mut tag[..8], 16).unwrap_err().is_capacity_violation());
        assert_eq!(
            ctx.ctrl(CipherCtrl::GetTag(&mut tag, 16)).unwrap(),
            ReturnCode::SUCCESS
        );
        assert!(ctx.set_tag(&tag, 16).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_decrypt_rejects_get_tag_accepts_set_tag() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.decrypt_init(Some(EvpCipher::aes_256_gcm()), Some(&KEY), Some(&IV))
            .unwrap();

        let tag = [0u8; 16];
        assert_eq!(
            ctx.ctrl(CipherCtrl::SetTag(&tag, 16)).unwrap(),
            ReturnCode::SUCCESS
        );
        assert!(ctx.set_tag(&tag[..4], 16).unwrap_err().is_capacity_violation());

        let mut out = [0u8; 16];
        ctx.final_(&mut out).unwrap();
        let mut read = [0u8; 16];
        assert!(ctx.get_tag(&mut read, 16).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_other_ctrl() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        let ctrl = CipherCtrl::Other { cmd: 0x20, arg: 0 };
        assert_eq!(ctrl.cmd(), 0x20);
        assert_eq!(ctx.ctrl(ctrl).unwrap(), ReturnCode::SUCCESS);
        assert_eq!(CipherCtrl::SetIvLen(12).cmd(), EVP_CTRL_AEAD_SET_IVLEN);
    }

    #[test]
    fn test_other_ctrl_rejects_aead_codes() {
        let mut ctx = EvpCipherCtx::new(&Provider::nominal()).unwrap();
        ctx.decrypt_init(Some(EvpCipher::aes_128_gcm()), Some(&KEY[..16]), Some(&IV))
            .unwrap();

        for cmd in [
            EVP_CTRL_AEAD_SET_IVLEN,
            EVP_CTRL_AEAD_GET_TAG,
            EVP_CTRL_AEAD_SET_TAG,
        ] {
            assert!(ctx
                .ctrl(CipherCtrl::Other { cmd, arg: 16 })
                .unwrap_err()
                .is_contract_violation());
        }
    }
}
