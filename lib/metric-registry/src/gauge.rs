/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

/// The instantaneous reading of a gauge, keeping the original value type.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    Signed(i64),
    Unsigned(u64),
    Double(f64),
    Text(String),
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for GaugeValue {
                fn from(v: $t) -> Self {
                    GaugeValue::Signed(i64::from(v))
                }
            }
        )*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for GaugeValue {
                fn from(v: $t) -> Self {
                    GaugeValue::Unsigned(u64::from(v))
                }
            }
        )*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<isize> for GaugeValue {
    fn from(v: isize) -> Self {
        GaugeValue::Signed(v as i64)
    }
}

impl From<usize> for GaugeValue {
    fn from(v: usize) -> Self {
        GaugeValue::Unsigned(v as u64)
    }
}

impl From<f32> for GaugeValue {
    fn from(v: f32) -> Self {
        GaugeValue::Double(f64::from(v))
    }
}

impl From<f64> for GaugeValue {
    fn from(v: f64) -> Self {
        GaugeValue::Double(v)
    }
}

impl From<String> for GaugeValue {
    fn from(v: String) -> Self {
        GaugeValue::Text(v)
    }
}

impl From<&str> for GaugeValue {
    fn from(v: &str) -> Self {
        GaugeValue::Text(v.to_string())
    }
}

type ValueProvider = Box<dyn Fn() -> Option<GaugeValue> + Send + Sync>;

/// A metric whose value is read on demand from a provider function.
pub struct Gauge {
    provider: ValueProvider,
}

impl Gauge {
    pub fn new<F, T>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Into<GaugeValue>,
    {
        Gauge {
            provider: Box::new(move || Some(f().into())),
        }
    }

    /// The provider may have nothing to report, in which case the gauge is
    /// skipped by reporters.
    pub fn optional<F, T>(f: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
        T: Into<GaugeValue>,
    {
        Gauge {
            provider: Box::new(move || f().map(Into::into)),
        }
    }

    #[inline]
    pub fn value(&self) -> Option<GaugeValue> {
        (self.provider)()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}
