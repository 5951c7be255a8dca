// Copyright (C) Microsoft Corporation. All rights reserved.

//! Model-checker harnesses.

#![cfg(kani)]
#![allow(clippy::unwrap_used)]

use std::rc::Rc;

use crate::config::ModelConfig;
use crate::encode::decode_block;
use crate::encode::encode_block;
use crate::evp_cipher::cipher::EvpCipher;
use crate::evp_cipher::ctx::EvpCipherCtx;
use crate::evp_md::md::EvpMd;
use crate::evp_md::ctx::EvpMdCtx;
use crate::evp_pkey::ctx::EvpPKeyCtx;
use crate::evp_pkey::ec_key::EcCurve;
use crate::evp_pkey::ec_key::EcKey;
use crate::evp_pkey::ec_key::KeyCapability;
use crate::evp_pkey::pkey::EvpPKey;
use crate::oracle::KaniOracle;
use crate::provider::Provider;

fn provider() -> Provider {
    Provider::new(ModelConfig::default(), KaniOracle)
}

fn keyed(provider: &Provider) -> EvpPKey {
    let key = EvpPKey::new(provider).unwrap();
    let capability: Rc<dyn KeyCapability> = Rc::new(EcKey::new(EcCurve::P256));
    key.set1_ec_key(Some(&capability));
    key
}

/// Reference count tracks handles and validity follows the capability.
#[kani::proof]
#[kani::unwind(4)]
fn verify_key_refcount() {
    let provider = provider();
    let key = keyed(&provider);
    let valid = key.is_valid();

    let extra = key.up_ref();
    assert_eq!(key.reference_count(), 2);
    extra.free();
    assert_eq!(key.reference_count(), 1);
    assert_eq!(key.is_valid(), valid);
}

/// A successful final reports exactly the digest size.
#[kani::proof]
#[kani::unwind(70)]
fn verify_digest_final_length() {
    let provider = provider();
    let mut ctx = EvpMdCtx::new(&provider).unwrap();
    kani::assume(ctx.digest_init(EvpMd::sha256()).unwrap().is_success());
    ctx.digest_update(b"data").unwrap();

    let mut out = [0u8; 32];
    let result = ctx.digest_final_ex(&mut out).unwrap();
    if let Some(len) = result.len {
        assert_eq!(len, 32);
    }
}

/// The size reported by a sign query is always a sufficient buffer.
#[kani::proof]
#[kani::unwind(80)]
fn verify_sign_two_phase_sizing() {
    let provider = provider();
    let key = keyed(&provider);
    kani::assume(key.is_valid());

    let mut ctx = EvpPKeyCtx::new(&key).unwrap();
    kani::assume(ctx.sign_init().unwrap().is_success());

    let query = ctx.sign(None, b"tbs").unwrap();
    if let Some(max) = query.len {
        let mut sig = vec![0u8; max];
        let result = ctx.sign(Some(&mut sig[..]), b"tbs");
        assert!(result.is_ok());
        if let Some(len) = result.unwrap().len {
            assert!(len <= max);
        }
    }
}

/// A bound-cipher encrypt update withholds at least one byte.
#[kani::proof]
#[kani::unwind(20)]
fn verify_cipher_update_bound() {
    let provider = provider();
    let mut ctx = EvpCipherCtx::new(&provider).unwrap();
    ctx.encrypt_init(Some(EvpCipher::aes_128_gcm()), None, None)
        .unwrap();

    let input_len: usize = kani::any();
    kani::assume(input_len <= 16);
    let input = [0u8; 16];
    let mut out = [0u8; 16];

    let result = ctx.update(Some(&mut out[..]), &input[..input_len]).unwrap();
    if let Some(len) = result.len {
        assert!(len <= input_len.saturating_sub(1));
        assert!(len <= out.len());
    }
}

/// Base64 length arithmetic holds on every path.
#[kani::proof]
#[kani::unwind(20)]
fn verify_base64_lengths() {
    let provider = provider();
    let n: usize = kani::any();
    kani::assume(n <= 9);
    let input = [0u8; 12];

    let mut text = [0u8; 17];
    let len = encode_block(&provider, &mut text, &input[..n]).unwrap();
    assert_eq!(len % 4, 0);
    assert!(len >= n);
    assert_eq!(text[len], 0);

    let mut raw = [0u8; 9];
    let blocks = n / 3;
    let code = decode_block(&provider, &mut raw, &input[..4 * blocks]).unwrap();
    assert!(code == (4 * blocks) as i32 || code == -1);
}
