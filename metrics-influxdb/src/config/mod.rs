/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, YamlLoader, yaml};

mod value;

pub mod influxdb;
pub use influxdb::InfluxdbConfig;

mod reporter;
pub use reporter::ReporterConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SenderKind {
    #[default]
    Influxdb,
    Console,
}

impl FromStr for SenderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "influxdb" | "http" => Ok(SenderKind::Influxdb),
            "console" | "stdout" => Ok(SenderKind::Console),
            _ => Err(anyhow!("invalid sender type: {s}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub influxdb: InfluxdbConfig,
    pub reporter: ReporterConfig,
    pub sender: SenderKind,
}

impl AppConfig {
    /// Parse every yaml document in `content`, later documents override
    /// the sections set by earlier ones.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let docs = YamlLoader::load_from_str(content)
            .map_err(|e| anyhow!("invalid yaml content: {e}"))?;
        let mut config = AppConfig::default();
        for (i, doc) in docs.iter().enumerate() {
            match doc {
                Yaml::Hash(map) => config
                    .load_doc(map)
                    .context(format!("failed to load yaml doc #{i}"))?,
                Yaml::Null => {}
                _ => return Err(anyhow!("yaml doc #{i} root should be hash")),
            }
        }
        Ok(config)
    }

    fn load_doc(&mut self, map: &yaml::Hash) -> anyhow::Result<()> {
        value::foreach_kv(map, |k, v| match value::normalize(k).as_str() {
            "influxdb" => {
                let Yaml::Hash(map) = v else {
                    return Err(anyhow!("value for key {k} should be a map"));
                };
                self.influxdb = InfluxdbConfig::parse(map)?;
                Ok(())
            }
            "reporter" => {
                let Yaml::Hash(map) = v else {
                    return Err(anyhow!("value for key {k} should be a map"));
                };
                self.reporter = ReporterConfig::parse(map)?;
                Ok(())
            }
            "sender" => {
                let s = value::as_string(v)?;
                self.sender = SenderKind::from_str(&s)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k} in main conf")),
        })
    }
}

pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
    AppConfig::parse_str(&content).context(format!("failed to parse {}", path.display()))
}
