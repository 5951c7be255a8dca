// Copyright (C) Microsoft Corporation. All rights reserved.

use crate::error::ModelError;
use crate::error::ModelResult;

/// Largest digest produced by any supported algorithm.
pub const EVP_MAX_MD_SIZE: usize = 64;

/// Supported digest families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvpMdType {
    /// MD5
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl EvpMdType {
    /// OpenSSL NID of the family.
    pub const fn nid(self) -> i32 {
        match self {
            EvpMdType::Md5 => 4,
            EvpMdType::Sha1 => 64,
            EvpMdType::Sha224 => 675,
            EvpMdType::Sha256 => 672,
            EvpMdType::Sha384 => 673,
            EvpMdType::Sha512 => 674,
        }
    }

    /// Digest length in bytes.
    pub const fn md_size(self) -> usize {
        match self {
            EvpMdType::Md5 => 16,
            EvpMdType::Sha1 => 20,
            EvpMdType::Sha224 => 28,
            EvpMdType::Sha256 => 32,
            EvpMdType::Sha384 => 48,
            EvpMdType::Sha512 => 64,
        }
    }

    /// Input block length in bytes.
    pub const fn block_size(self) -> usize {
        match self {
            EvpMdType::Sha384 | EvpMdType::Sha512 => 128,
            _ => 64,
        }
    }

    /// Short name of the family.
    pub const fn name(self) -> &'static str {
        match self {
            EvpMdType::Md5 => "MD5",
            EvpMdType::Sha1 => "SHA1",
            EvpMdType::Sha224 => "SHA224",
            EvpMdType::Sha256 => "SHA256",
            EvpMdType::Sha384 => "SHA384",
            EvpMdType::Sha512 => "SHA512",
        }
    }

    /// Look up a family by NID
    pub fn from_nid(nid: i32) -> ModelResult<Self> {
        match nid {
            4 => Ok(EvpMdType::Md5),
            64 => Ok(EvpMdType::Sha1),
            675 => Ok(EvpMdType::Sha224),
            672 => Ok(EvpMdType::Sha256),
            673 => Ok(EvpMdType::Sha384),
            674 => Ok(EvpMdType::Sha512),
            _ => {
                tracing::error!(nid, "EvpMdType::from_nid: unsupported digest");
                Err(ModelError::HashNotSupported(nid))
            }
        }
    }
}

/// Digest descriptor (`EVP_MD`).
///
/// The registry descriptors are process-wide constants handed out as
/// `&'static EvpMd`. A descriptor assembled with [`EvpMd::from_parts`] may
/// disagree with its family and is then not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvpMd {
    md_type: EvpMdType,
    md_size: usize,
}

static MD5: EvpMd = EvpMd::registered(EvpMdType::Md5);
static SHA1: EvpMd = EvpMd::registered(EvpMdType::Sha1);
static SHA224: EvpMd = EvpMd::registered(EvpMdType::Sha224);
static SHA256: EvpMd = EvpMd::registered(EvpMdType::Sha256);
static SHA384: EvpMd = EvpMd::registered(EvpMdType::Sha384);
static SHA512: EvpMd = EvpMd::registered(EvpMdType::Sha512);

impl EvpMd {
    const fn registered(md_type: EvpMdType) -> Self {
        Self {
            md_type,
            md_size: md_type.md_size(),
        }
    }

    /// Registry descriptor for `md_type`.
    pub fn new(md_type: EvpMdType) -> &'static EvpMd {
        match md_type {
            EvpMdType::Md5 => &MD5,
            EvpMdType::Sha1 => &SHA1,
            EvpMdType::Sha224 => &SHA224,
            EvpMdType::Sha256 => &SHA256,
            EvpMdType::Sha384 => &SHA384,
            EvpMdType::Sha512 => &SHA512,
        }
    }

    /// Registry descriptor for `nid`.
    pub fn from_nid(nid: i32) -> ModelResult<&'static EvpMd> {
        EvpMdType::from_nid(nid).map(EvpMd::new)
    }

    /// Descriptor built outside the registry.
    pub const fn from_parts(md_type: EvpMdType, md_size: usize) -> Self {
        Self { md_type, md_size }
    }

    /// `EVP_md5()`
    pub fn md5() -> &'static EvpMd {
        &MD5
    }

    /// `EVP_sha1()`
    pub fn sha1() -> &'static EvpMd {
        &SHA1
    }

    /// `EVP_sha224()`
    pub fn sha224() -> &'static EvpMd {
        &SHA224
    }

    /// `EVP_sha256()`
    pub fn sha256() -> &'static EvpMd {
        &SHA256
    }

    /// `EVP_sha384()`
    pub fn sha384() -> &'static EvpMd {
        &SHA384
    }

    /// `EVP_sha512()`
    pub fn sha512() -> &'static EvpMd {
        &SHA512
    }

    /// Digest family.
    pub fn md_type(&self) -> EvpMdType {
        self.md_type
    }

    /// NID of the digest family.
    pub fn nid(&self) -> i32 {
        self.md_type.nid()
    }

    /// `EVP_MD_size`
    pub fn size(&self) -> usize {
        self.md_size
    }

    /// `EVP_MD_block_size`
    pub fn block_size(&self) -> usize {
        self.md_type.block_size()
    }

    /// Size agrees with the family and fits `EVP_MAX_MD_SIZE`.
    pub fn is_valid(&self) -> bool {
        self.md_size == self.md_type.md_size() && self.md_size <= EVP_MAX_MD_SIZE
    }
}
