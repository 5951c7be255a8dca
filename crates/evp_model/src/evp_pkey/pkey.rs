// Copyright (C) Microsoft Corporation. All rights reserved.

use std::cell::Ref;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::ec_key::KeyCapability;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::oracle::site;
use crate::provider::Provider;

struct PKeyInner {
    provider: Provider,
    capability: RefCell<Option<Rc<dyn KeyCapability>>>,
}

impl Drop for PKeyInner {
    fn drop(&mut self) {
        tracing::debug!(
            bound = self.capability.get_mut().is_some(),
            "EvpPKey: last reference released"
        );
    }
}

/// Reference-counted asymmetric key handle.
///
/// Cloning a handle is `EVP_PKEY_up_ref`; dropping one is `EVP_PKEY_free`.
/// The bound capability is released together with the last handle, and a
/// count can never go below zero because releasing consumes the handle.
#[derive(Clone)]
pub struct EvpPKey {
    inner: Rc<PKeyInner>,
}

impl fmt::Debug for EvpPKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvpPKey")
            .field("references", &self.reference_count())
            .field("capability", &self.inner.capability.borrow())
            .finish()
    }
}

impl EvpPKey {
    /// Create a new key with a reference count of 1 and nothing bound
    ///
    /// # Return
    /// AllocationFailed when allocation failure is modeled and chosen
    pub fn new(provider: &Provider) -> ModelResult<Self> {
        provider.allocate("EvpPKey")?;

        Ok(Self {
            inner: Rc::new(PKeyInner {
                provider: provider.clone(),
                capability: RefCell::new(None),
            }),
        })
    }

    /// Bind an EC key capability, taking a reference to it
    ///
    /// # Argument
    /// * `key` - Capability to bind; `None` models a null key
    ///
    /// # Return
    /// 1 on success, 0 without any change when the key is missing or
    /// invalid or the engine fails
    pub fn set1_ec_key(&self, key: Option<&Rc<dyn KeyCapability>>) -> ReturnCode {
        let Some(key) = key else {
            tracing::warn!("EvpPKey::set1_ec_key: null key");
            return ReturnCode::FAIL;
        };
        if !key.is_valid() {
            tracing::warn!("EvpPKey::set1_ec_key: invalid key");
            return ReturnCode::FAIL;
        }
        if !self.inner.provider.succeeds(site::PKEY_SET1_EC_KEY) {
            return ReturnCode::FAIL;
        }

        self.inner.capability.replace(Some(key.clone()));
        ReturnCode::SUCCESS
    }

    /// Borrow the bound capability without taking a reference
    pub fn get0_ec_key(&self) -> Option<Ref<'_, Rc<dyn KeyCapability>>> {
        Ref::filter_map(self.inner.capability.borrow(), Option::as_ref).ok()
    }

    /// Number of live handles to this key.
    pub fn reference_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Number of live references to the bound capability, if any.
    pub fn capability_reference_count(&self) -> Option<usize> {
        self.inner
            .capability
            .borrow()
            .as_ref()
            .map(Rc::strong_count)
    }

    /// Take another reference to the key.
    pub fn up_ref(&self) -> EvpPKey {
        self.clone()
    }

    /// Key is usable: it has live references and its capability, if bound,
    /// is valid.
    pub fn is_valid(&self) -> bool {
        self.reference_count() > 0
            && self
                .inner
                .capability
                .borrow()
                .as_ref()
                .map_or(true, |capability| capability.is_valid())
    }

    /// Release this reference to the key.
    pub fn free(self) {
        tracing::trace!(
            remaining = self.reference_count() - 1,
            "EvpPKey::free"
        );
    }

    /// Both handles refer to the same key.
    pub fn ptr_eq(&self, other: &EvpPKey) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn provider(&self) -> &Provider {
        &self.inner.provider
    }
}
