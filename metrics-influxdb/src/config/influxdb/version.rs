/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use yaml_rust::Yaml;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    V1,
    V2,
    V3,
}

impl ApiVersion {
    pub(crate) fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        match value {
            Yaml::String(s) => ApiVersion::from_str(s),
            Yaml::Integer(i) => match i {
                1 => Ok(ApiVersion::V1),
                2 => Ok(ApiVersion::V2),
                3 => Ok(ApiVersion::V3),
                _ => Err(anyhow!("unsupported api version {i}")),
            },
            _ => Err(anyhow!(
                "yaml value type for api version should be 'string' or 'integer'"
            )),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "v1" => Ok(ApiVersion::V1),
            "2" | "v2" => Ok(ApiVersion::V2),
            "3" | "v3" => Ok(ApiVersion::V3),
            _ => Err(anyhow!("invalid api version: {s}")),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => f.write_str("v1"),
            ApiVersion::V2 => f.write_str("v2"),
            ApiVersion::V3 => f.write_str("v3"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(anyhow!("unsupported scheme: {s}")),
        }
    }
}
