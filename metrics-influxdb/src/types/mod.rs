/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod tag;
pub use tag::TagMap;

mod value;
pub use value::{DisplayInfluxdbValue, FieldValue, InvalidFieldValue};

mod field;
pub use field::FieldSet;
