// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

pub mod chunk;
pub mod config;
pub mod extract;
pub mod stream;
