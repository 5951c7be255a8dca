// Copyright (C) Microsoft Corporation. All rights reserved.

//! Digest descriptors, digest contexts and digest-verify flows.

pub mod ctx;
pub mod md;
pub mod verify;
