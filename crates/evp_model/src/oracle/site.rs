// Copyright (C) Microsoft Corporation. All rights reserved.

//! Names of the nondeterministic decision points.
//!
//! Sites ending in `_OUTPUT` choose the length and content of an output
//! buffer; the others choose whether the call succeeds.

pub const ALLOCATION: &str = "alloc";

pub const PKEY_SET1_EC_KEY: &str = "EvpPKey::set1_ec_key";

pub const PKEY_SIGN_INIT: &str = "EvpPKeyCtx::sign_init";
pub const PKEY_DERIVE_INIT: &str = "EvpPKeyCtx::derive_init";
pub const PKEY_ENCRYPT_INIT: &str = "EvpPKeyCtx::encrypt_init";
pub const PKEY_DECRYPT_INIT: &str = "EvpPKeyCtx::decrypt_init";
pub const PKEY_SIGN: &str = "EvpPKeyCtx::sign";
pub const PKEY_SIGN_OUTPUT: &str = "EvpPKeyCtx::sign:output";
pub const PKEY_DERIVE: &str = "EvpPKeyCtx::derive";
pub const PKEY_DERIVE_OUTPUT: &str = "EvpPKeyCtx::derive:output";
pub const PKEY_ENCRYPT: &str = "EvpPKeyCtx::encrypt";
pub const PKEY_ENCRYPT_OUTPUT: &str = "EvpPKeyCtx::encrypt:output";
pub const PKEY_DECRYPT: &str = "EvpPKeyCtx::decrypt";
pub const PKEY_DECRYPT_OUTPUT: &str = "EvpPKeyCtx::decrypt:output";
pub const PKEY_SET_RSA_PADDING: &str = "EvpPKeyCtx::set_rsa_padding";
pub const PKEY_SET_RSA_OAEP_MD: &str = "EvpPKeyCtx::set_rsa_oaep_md";
pub const PKEY_SET_RSA_MGF1_MD: &str = "EvpPKeyCtx::set_rsa_mgf1_md";
pub const PKEY_CTRL: &str = "EvpPKeyCtx::ctrl";

pub const DIGEST_INIT: &str = "EvpMdCtx::digest_init";
pub const DIGEST_INIT_OUTPUT: &str = "EvpMdCtx::digest_init:output";
pub const DIGEST_UPDATE: &str = "EvpMdCtx::digest_update";
pub const DIGEST_UPDATE_OUTPUT: &str = "EvpMdCtx::digest_update:output";
pub const DIGEST_FINAL: &str = "EvpMdCtx::digest_final_ex";
pub const DIGEST_FINAL_OUTPUT: &str = "EvpMdCtx::digest_final_ex:output";
pub const MD_CTX_CLEANUP: &str = "EvpMdCtx::cleanup";
pub const MD_CTX_COPY: &str = "EvpMdCtx::copy_ex";
pub const DIGEST_VERIFY_INIT: &str = "EvpMdCtx::digest_verify_init";
pub const DIGEST_VERIFY_FINAL: &str = "EvpMdCtx::digest_verify_final";

pub const HMAC_INIT: &str = "HmacCtx::init_ex";
pub const HMAC_UPDATE: &str = "HmacCtx::update";
pub const HMAC_FINAL: &str = "HmacCtx::final_";
pub const HMAC_FINAL_OUTPUT: &str = "HmacCtx::final_:output";
pub const HMAC_OUTPUT: &str = "hmac:output";

pub const CIPHER_INIT: &str = "EvpCipherCtx::init";
pub const CIPHER_SET_IV_LEN: &str = "EvpCipherCtx::set_iv_len";
pub const CIPHER_GET_TAG: &str = "EvpCipherCtx::get_tag";
pub const CIPHER_GET_TAG_OUTPUT: &str = "EvpCipherCtx::get_tag:output";
pub const CIPHER_SET_TAG: &str = "EvpCipherCtx::set_tag";
pub const CIPHER_CTRL: &str = "EvpCipherCtx::ctrl";
pub const CIPHER_UPDATE: &str = "EvpCipherCtx::update";
pub const CIPHER_UPDATE_OUTPUT: &str = "EvpCipherCtx::update:output";
pub const CIPHER_FINAL: &str = "EvpCipherCtx::final_";
pub const CIPHER_FINAL_OUTPUT: &str = "EvpCipherCtx::final_:output";

pub const DECODE_BLOCK: &str = "decode_block";
pub const DECODE_BLOCK_OUTPUT: &str = "decode_block:output";
pub const ENCODE_BLOCK_OUTPUT: &str = "encode_block:output";
