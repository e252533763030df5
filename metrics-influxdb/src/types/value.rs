/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::{self, Write};

use memchr::{memchr, memchr2};
use thiserror::Error;

use metric_registry::GaugeValue;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFieldValue {
    #[error("non-finite float")]
    NonFinite,
    #[error("unsigned value exceeds i64::MAX")]
    UnsignedOverflow,
    #[error("newline in string value")]
    Newline,
    #[error("nul byte in string value")]
    Nul,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn check(&self) -> Result<(), InvalidFieldValue> {
        match self {
            FieldValue::Integer(_) => Ok(()),
            FieldValue::Unsigned(u) => {
                if *u > i64::MAX as u64 {
                    Err(InvalidFieldValue::UnsignedOverflow)
                } else {
                    Ok(())
                }
            }
            FieldValue::Float(f) => {
                if f.is_finite() {
                    Ok(())
                } else {
                    Err(InvalidFieldValue::NonFinite)
                }
            }
            FieldValue::Text(s) => {
                if memchr2(b'\n', b'\r', s.as_bytes()).is_some() {
                    Err(InvalidFieldValue::Newline)
                } else if memchr(b'\0', s.as_bytes()).is_some() {
                    Err(InvalidFieldValue::Nul)
                } else {
                    Ok(())
                }
            }
        }
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, FieldValue::Integer(_) | FieldValue::Unsigned(_))
    }

    /// Wire rendering, only meaningful for values that passed `check`.
    pub fn display_influxdb(&self) -> DisplayInfluxdbValue<'_> {
        DisplayInfluxdbValue(self)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<GaugeValue> for FieldValue {
    fn from(v: GaugeValue) -> Self {
        match v {
            GaugeValue::Signed(i) => FieldValue::Integer(i),
            GaugeValue::Unsigned(u) => FieldValue::Unsigned(u),
            GaugeValue::Double(f) => FieldValue::Float(f),
            GaugeValue::Text(s) => FieldValue::Text(s),
        }
    }
}

pub struct DisplayInfluxdbValue<'a>(&'a FieldValue);

impl fmt::Display for DisplayInfluxdbValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            FieldValue::Integer(i) => {
                f.write_str(itoa::Buffer::new().format(*i))?;
                f.write_char('i')
            }
            // no 'u' suffix, v1 servers do not accept it
            FieldValue::Unsigned(u) => {
                f.write_str(itoa::Buffer::new().format(*u))?;
                f.write_char('i')
            }
            FieldValue::Float(v) => f.write_str(ryu::Buffer::new().format(*v)),
            FieldValue::Text(s) => {
                f.write_char('"')?;
                let mut left = s.as_str();
                while let Some(p) = memchr2(b'"', b'\\', left.as_bytes()) {
                    f.write_str(&left[..p])?;
                    f.write_char('\\')?;
                    f.write_char(left.as_bytes()[p] as char)?;
                    left = &left[p + 1..];
                }
                f.write_str(left)?;
                f.write_char('"')
            }
        }
    }
}
