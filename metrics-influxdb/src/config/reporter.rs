/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use super::value;
use crate::extract::TimeUnit;
use crate::transform::{
    MeasurementTransformer, NoopTransformer, PrefixTransformer, TemplateTransformer,
};
use crate::types::TagMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReporterConfig {
    pub emit_interval: Duration,
    pub rate_unit: TimeUnit,
    pub duration_unit: TimeUnit,
    pub tags: TagMap,
    pub prefix: Option<String>,
    pub template: Option<String>,
    pub timestamp: bool,
    pub shutdown_grace: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig::new()
    }
}

impl ReporterConfig {
    pub fn new() -> Self {
        ReporterConfig {
            emit_interval: Duration::from_secs(10),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            tags: TagMap::new(),
            prefix: None,
            template: None,
            timestamp: true,
            shutdown_grace: Duration::from_secs(5),
        }
    }

    pub(crate) fn parse(map: &yaml::Hash) -> anyhow::Result<Self> {
        let mut config = ReporterConfig::new();
        value::foreach_kv(map, |k, v| config.set(k, v))?;
        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match value::normalize(k).as_str() {
            "emit_interval" | "interval" => {
                self.emit_interval = value::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "rate_unit" => {
                let s = value::as_string(v)?;
                self.rate_unit =
                    TimeUnit::from_str(&s).context(format!("invalid time unit for key {k}"))?;
                Ok(())
            }
            "duration_unit" => {
                let s = value::as_string(v)?;
                self.duration_unit =
                    TimeUnit::from_str(&s).context(format!("invalid time unit for key {k}"))?;
                Ok(())
            }
            "tags" | "global_tags" => {
                self.tags = value::as_tag_map(v)?;
                Ok(())
            }
            "prefix" => {
                let prefix = value::as_string(v)?;
                self.prefix = if prefix.is_empty() {
                    None
                } else {
                    Some(prefix)
                };
                Ok(())
            }
            "template" => {
                self.template = Some(value::as_string(v)?);
                Ok(())
            }
            "timestamp" => {
                self.timestamp = value::as_bool(v)?;
                Ok(())
            }
            "shutdown_grace" => {
                self.shutdown_grace = value::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.emit_interval.is_zero() {
            return Err(anyhow!("emit interval should not be zero"));
        }
        if let Some(template) = &self.template {
            TemplateTransformer::new(template)?;
        }
        Ok(())
    }

    /// The transformer chain selected by `template` and `prefix`.
    pub fn build_transformer(&self) -> anyhow::Result<Box<dyn MeasurementTransformer>> {
        let transformer: Box<dyn MeasurementTransformer> =
            match (&self.template, &self.prefix) {
                (Some(template), Some(prefix)) => Box::new(PrefixTransformer::wrap(
                    prefix.as_str(),
                    TemplateTransformer::new(template)?,
                )),
                (Some(template), None) => Box::new(TemplateTransformer::new(template)?),
                (None, Some(prefix)) => Box::new(PrefixTransformer::new(prefix.as_str())),
                (None, None) => Box::new(NoopTransformer),
            };
        Ok(transformer)
    }
}
