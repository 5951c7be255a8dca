// Copyright (C) Microsoft Corporation. All rights reserved.

//! Behavioral model of an EVP-style cryptographic provider.
//!
//! Keys, asymmetric contexts, digests, MACs, symmetric ciphers and the
//! base64 block codec follow the calling contract of the real API: which
//! calls are legal in which state, how large every output may become and
//! which return codes a caller must be prepared for. What the engine
//! actually computes is left to an [`oracle::Oracle`], so the same code runs
//! deterministically under [`oracle::NominalOracle`], exhaustively under
//! [`oracle::Explorer`], or symbolically under the model checker.
//!
//! Calling a function out of contract or handing it a buffer that is too
//! small returns a [`ModelError`]; engine outcomes are [`ReturnCode`]s.

pub mod buffer;
pub mod config;
pub mod encode;
pub mod error;
pub mod evp_cipher;
pub mod evp_md;
pub mod evp_pkey;
pub mod hmac;
pub mod log;
pub mod oracle;
#[cfg(kani)]
mod proofs;
pub mod provider;

pub use config::ModelConfig;
pub use error::ModelError;
pub use error::ModelResult;
pub use error::ReturnCode;
pub use provider::Provider;
