/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod config;
pub mod extract;
pub mod opts;
pub mod protocol;
pub mod report;
pub mod runtime;
pub mod send;
pub mod transform;
pub mod types;

pub mod build;
pub mod log;
pub mod stat;
