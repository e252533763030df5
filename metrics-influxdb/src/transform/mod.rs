/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use crate::types::TagMap;

mod prefix;
pub use prefix::PrefixTransformer;

mod template;
pub use template::TemplateTransformer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("name {name} does not match template {template}")]
    TemplateMismatch { name: String, template: String },
    #[error("no measurement left after transforming {0}")]
    NoMeasurement(String),
    #[error("{0}")]
    Other(String),
}

/// The measurement name and per metric tags a metric is written with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub name: String,
    pub tags: TagMap,
}

impl Measurement {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Measurement {
            name: name.into(),
            tags: TagMap::new(),
        }
    }

    pub fn with_tags<T: Into<String>>(name: T, tags: TagMap) -> Self {
        Measurement {
            name: name.into(),
            tags,
        }
    }
}

/// Maps a registry metric name to the measurement it is reported as.
///
/// Called once for each metric in every cycle, before its fields are read.
pub trait MeasurementTransformer: Send + Sync {
    fn transform(&self, metric_name: &str) -> Result<Measurement, TransformError>;
}

impl<F> MeasurementTransformer for F
where
    F: Fn(&str) -> Result<Measurement, TransformError> + Send + Sync,
{
    fn transform(&self, metric_name: &str) -> Result<Measurement, TransformError> {
        self(metric_name)
    }
}

/// Uses the metric name as is, without tags.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTransformer;

impl MeasurementTransformer for NoopTransformer {
    fn transform(&self, metric_name: &str) -> Result<Measurement, TransformError> {
        Ok(Measurement::new(metric_name))
    }
}
