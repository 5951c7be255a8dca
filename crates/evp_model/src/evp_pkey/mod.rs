// Copyright (C) Microsoft Corporation. All rights reserved.

//! Asymmetric keys and the operation contexts built on them.

pub mod ctx;
pub mod ec_key;
pub mod padding;
pub mod pkey;
