// Copyright (C) Microsoft Corporation. All rights reserved.

//! Symmetric cipher descriptors and contexts.

pub mod cipher;
pub mod ctx;
