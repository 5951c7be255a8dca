// Copyright (C) Microsoft Corporation. All rights reserved.

use crate::error::contract_violation;
use crate::error::ModelError;

/// RSA padding modes accepted by `EVP_PKEY_CTX_set_rsa_padding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RsaPadding {
    /// PKCS#1 v1.5
    Pkcs1 = 1,
    /// SSLv23
    Sslv23 = 2,
    /// No padding
    None = 3,
    /// PKCS#1 OAEP
    Pkcs1Oaep = 4,
    /// ANSI X9.31, signing only
    X931 = 5,
    /// PKCS#1 PSS, signing only
    Pkcs1Pss = 6,
}

impl RsaPadding {
    /// Raw value of the padding mode.
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for RsaPadding {
    type Error = ModelError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RsaPadding::Pkcs1),
            2 => Ok(RsaPadding::Sslv23),
            3 => Ok(RsaPadding::None),
            4 => Ok(RsaPadding::Pkcs1Oaep),
            5 => Ok(RsaPadding::X931),
            6 => Ok(RsaPadding::Pkcs1Pss),
            _ => Err(contract_violation(
                "RsaPadding::try_from",
                format!("unknown padding mode {value}"),
            )),
        }
    }
}
