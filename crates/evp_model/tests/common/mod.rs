// Copyright (C) Microsoft Corporation. All rights reserved.

#![allow(dead_code)]

use std::rc::Rc;

use evp_model::evp_pkey::ec_key::EcCurve;
use evp_model::evp_pkey::ec_key::EcKey;
use evp_model::evp_pkey::ec_key::KeyCapability;
use evp_model::evp_pkey::pkey::EvpPKey;
use evp_model::oracle::ExplorationReport;
use evp_model::oracle::Explorer;
use evp_model::ModelConfig;
use evp_model::ModelResult;
use evp_model::Provider;

/// Key bound to a fresh P-256 capability. Binding may fail on some paths.
pub fn helper_ec_pkey(provider: &Provider) -> ModelResult<EvpPKey> {
    let key = EvpPKey::new(provider)?;
    let capability: Rc<dyn KeyCapability> = Rc::new(EcKey::new(EcCurve::P256));
    key.set1_ec_key(Some(&capability));
    Ok(key)
}

/// Explore every path of `client` under the default configuration and
/// panic with the failing trace if any path returns an error.
pub fn helper_explore<F>(client: F) -> ExplorationReport
where
    F: FnMut(&Provider) -> ModelResult<()>,
{
    let report = Explorer::new(ModelConfig::default()).run(client);
    match report {
        Ok(report) => {
            assert!(!report.truncated, "exploration truncated: {report:?}");
            report
        }
        Err(err) => panic!("{err}: {:?}", err.path),
    }
}
