/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimestampPrecision {
    Seconds,
    #[default]
    MilliSeconds,
    MicroSeconds,
    NanoSeconds,
}

impl TimestampPrecision {
    pub fn v1_query_value(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::MilliSeconds => "ms",
            Self::MicroSeconds => "u",
            Self::NanoSeconds => "ns",
        }
    }

    pub fn v2_query_value(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::MilliSeconds => "ms",
            Self::MicroSeconds => "us",
            Self::NanoSeconds => "ns",
        }
    }

    pub fn v3_query_value(self) -> &'static str {
        match self {
            Self::Seconds => "second",
            Self::MilliSeconds => "millisecond",
            Self::MicroSeconds => "microsecond",
            Self::NanoSeconds => "nanosecond",
        }
    }

    /// None if the time can not be expressed as i64 nanoseconds.
    pub fn timestamp(self, time: &DateTime<Utc>) -> Option<i64> {
        match self {
            Self::Seconds => Some(time.timestamp()),
            Self::MilliSeconds => Some(time.timestamp_millis()),
            Self::MicroSeconds => Some(time.timestamp_micros()),
            Self::NanoSeconds => time.timestamp_nanos_opt(),
        }
    }
}

impl FromStr for TimestampPrecision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "second" | "seconds" => Ok(TimestampPrecision::Seconds),
            "ms" | "millisecond" | "milliseconds" => Ok(TimestampPrecision::MilliSeconds),
            "u" | "us" | "microsecond" | "microseconds" => Ok(TimestampPrecision::MicroSeconds),
            "n" | "ns" | "nanosecond" | "nanoseconds" => Ok(TimestampPrecision::NanoSeconds),
            _ => Err(anyhow!("invalid timestamp precision: {s}")),
        }
    }
}
