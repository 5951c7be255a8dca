// Copyright (C) Microsoft Corporation. All rights reserved.

use std::cell::Cell;
use std::fmt::Debug;

/// Underlying key material bound to an [`EvpPKey`](super::pkey::EvpPKey).
///
/// The model never looks inside a capability; it only asks whether the
/// capability is still usable.
pub trait KeyCapability: Debug {
    /// True while the capability may be used.
    fn is_valid(&self) -> bool;
}

/// Supported EC curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    /// NIST P-256
    P256,
    /// NIST P-384
    P384,
    /// NIST P-521
    P521,
}

impl EcCurve {
    /// OpenSSL NID of the curve.
    pub const fn nid(self) -> i32 {
        match self {
            EcCurve::P256 => 415,
            EcCurve::P384 => 715,
            EcCurve::P521 => 716,
        }
    }
}

/// Opaque elliptic-curve key.
#[derive(Debug)]
pub struct EcKey {
    curve: EcCurve,
    valid: Cell<bool>,
}

impl EcKey {
    /// Creates a valid key on `curve`.
    pub fn new(curve: EcCurve) -> Self {
        Self {
            curve,
            valid: Cell::new(true),
        }
    }

    /// Curve of the key.
    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Marks the key as no longer usable.
    pub fn invalidate(&self) {
        tracing::debug!(curve = ?self.curve, "EcKey::invalidate");
        self.valid.set(false);
    }
}

impl KeyCapability for EcKey {
    fn is_valid(&self) -> bool {
        self.valid.get()
    }
}
