// Copyright (C) Microsoft Corporation. All rights reserved.

/// Nominal block width recorded on every descriptor, in bits.
pub const CIPHER_BLOCK_BITS: usize = 128;

/// Supported cipher variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvpCipherType {
    /// AES-128 in GCM mode
    Aes128Gcm,
    /// AES-192 in GCM mode
    Aes192Gcm,
    /// AES-256 in GCM mode
    Aes256Gcm,
    /// AES-128 in ECB mode
    Aes128Ecb,
}

/// Cipher descriptor (`EVP_CIPHER`); one immutable instance per variant.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EvpCipher {
    cipher_type: EvpCipherType,
    nid: i32,
    key_len: usize,
    iv_len: usize,
    block_size: usize,
}

static AES_128_GCM: EvpCipher = EvpCipher {
    cipher_type: EvpCipherType::Aes128Gcm,
    nid: 895,
    key_len: 16,
    iv_len: 12,
    block_size: 1,
};

static AES_192_GCM: EvpCipher = EvpCipher {
    cipher_type: EvpCipherType::Aes192Gcm,
    nid: 898,
    key_len: 24,
    iv_len: 12,
    block_size: 1,
};

static AES_256_GCM: EvpCipher = EvpCipher {
    cipher_type: EvpCipherType::Aes256Gcm,
    nid: 901,
    key_len: 32,
    iv_len: 12,
    block_size: 1,
};

static AES_128_ECB: EvpCipher = EvpCipher {
    cipher_type: EvpCipherType::Aes128Ecb,
    nid: 418,
    key_len: 16,
    iv_len: 0,
    block_size: 16,
};

impl EvpCipher {
    /// Descriptor for `cipher_type`.
    pub fn new(cipher_type: EvpCipherType) -> &'static EvpCipher {
        match cipher_type {
            EvpCipherType::Aes128Gcm => &AES_128_GCM,
            EvpCipherType::Aes192Gcm => &AES_192_GCM,
            EvpCipherType::Aes256Gcm => &AES_256_GCM,
            EvpCipherType::Aes128Ecb => &AES_128_ECB,
        }
    }

    /// `EVP_aes_128_gcm()`
    pub fn aes_128_gcm() -> &'static EvpCipher {
        &AES_128_GCM
    }

    /// `EVP_aes_192_gcm()`
    pub fn aes_192_gcm() -> &'static EvpCipher {
        &AES_192_GCM
    }

    /// `EVP_aes_256_gcm()`
    pub fn aes_256_gcm() -> &'static EvpCipher {
        &AES_256_GCM
    }

    /// `EVP_aes_128_ecb()`
    pub fn aes_128_ecb() -> &'static EvpCipher {
        &AES_128_ECB
    }

    /// Variant of the descriptor.
    pub fn cipher_type(&self) -> EvpCipherType {
        self.cipher_type
    }

    /// OpenSSL NID.
    pub fn nid(&self) -> i32 {
        self.nid
    }

    /// Key length in bytes.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Default IV length in bytes.
    pub fn iv_len(&self) -> usize {
        self.iv_len
    }

    /// Block size as reported by `EVP_CIPHER_block_size`.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Nominal block width in bits.
    pub fn block_bits(&self) -> usize {
        CIPHER_BLOCK_BITS
    }

    /// Supports the AEAD tag controls.
    pub fn is_aead(&self) -> bool {
        !matches!(self.cipher_type, EvpCipherType::Aes128Ecb)
    }
}
