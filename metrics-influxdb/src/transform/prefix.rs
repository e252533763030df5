/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{Measurement, MeasurementTransformer, NoopTransformer, TransformError};

/// Prepends `prefix.` to the measurement produced by the inner transformer.
pub struct PrefixTransformer<T = NoopTransformer> {
    prefix: String,
    inner: T,
}

impl PrefixTransformer<NoopTransformer> {
    pub fn new<P: Into<String>>(prefix: P) -> Self {
        PrefixTransformer::wrap(prefix, NoopTransformer)
    }
}

impl<T: MeasurementTransformer> PrefixTransformer<T> {
    pub fn wrap<P: Into<String>>(prefix: P, inner: T) -> Self {
        PrefixTransformer {
            prefix: prefix.into(),
            inner,
        }
    }
}

impl<T: MeasurementTransformer> MeasurementTransformer for PrefixTransformer<T> {
    fn transform(&self, metric_name: &str) -> Result<Measurement, TransformError> {
        let mut m = self.inner.transform(metric_name)?;
        if !self.prefix.is_empty() {
            m.name = format!("{}.{}", self.prefix, m.name);
        }
        Ok(m)
    }
}
