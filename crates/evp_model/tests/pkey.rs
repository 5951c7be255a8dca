// Copyright (C) Microsoft Corporation. All rights reserved.

#![cfg(test)]

mod common;

use evp_model::evp_pkey::ctx::EvpPKeyCtx;
use evp_model::evp_pkey::ctx::Operation;
use evp_model::evp_pkey::padding::RsaPadding;
use evp_model::evp_md::md::EvpMd;
use evp_model::Provider;
use evp_model::ReturnCode;
use test_with_tracing::test;

use crate::common::*;

#[test]
fn test_sign_query_size_is_sufficient() {
    let report = helper_explore(|provider| {
        let key = helper_ec_pkey(provider)?;
        if !key.is_valid() {
            return Ok(());
        }

        let mut ctx = EvpPKeyCtx::new(&key)?;
        if !ctx.sign_init()?.is_success() {
            assert_eq!(ctx.operation(), Operation::Uninitialized);
            return Ok(());
        }

        let query = ctx.sign(None, b"to be signed")?;
        let Some(max) = query.len else {
            assert!(!query.code.is_success());
            return Ok(());
        };

        let mut sig = vec![0u8; max];
        let result = ctx.sign(Some(&mut sig[..]), b"to be signed")?;
        if let Some(len) = result.len {
            assert!(len <= max);
        }
        Ok(())
    });
    assert!(report.paths > 1);
}

#[test]
fn test_reference_count_follows_handles() {
    helper_explore(|provider| {
        let key = helper_ec_pkey(provider)?;
        assert_eq!(key.reference_count(), 1);
        assert!(key.is_valid());

        let ctx = EvpPKeyCtx::new(&key)?;
        let copy = ctx.dup()?;
        assert_eq!(key.reference_count(), 3);

        ctx.free();
        drop(copy);
        assert_eq!(key.reference_count(), 1);
        assert!(key.is_valid());
        Ok(())
    });
}

#[test]
fn test_derive_without_key() {
    let provider = Provider::nominal();
    let mut ctx = EvpPKeyCtx::new_id(&provider, 408).unwrap();
    assert_eq!(ctx.derive_init().unwrap(), ReturnCode::SUCCESS);

    let query = ctx.derive(None).unwrap();
    assert_eq!(query.len, Some(32));

    let mut secret = [0u8; 16];
    let result = ctx.derive(Some(&mut secret[..])).unwrap();
    assert_eq!(result.len, Some(16));
}

#[test]
fn test_oaep_configuration() {
    let provider = Provider::nominal();
    let key = helper_ec_pkey(&provider).unwrap();
    let mut ctx = EvpPKeyCtx::new(&key).unwrap();
    ctx.encrypt_init().unwrap();

    assert!(ctx
        .set_rsa_oaep_md(EvpMd::sha256())
        .unwrap_err()
        .is_contract_violation());
    assert_eq!(
        ctx.set_rsa_padding(RsaPadding::Pkcs1Oaep.as_raw()).unwrap(),
        ReturnCode::SUCCESS
    );
    assert_eq!(ctx.set_rsa_oaep_md(EvpMd::sha256()).unwrap(), ReturnCode::SUCCESS);
    assert_eq!(ctx.set_rsa_mgf1_md(EvpMd::sha1()).unwrap(), ReturnCode::SUCCESS);
    assert_eq!(ctx.rsa_oaep_md(), Some(EvpMd::sha256()));
}
