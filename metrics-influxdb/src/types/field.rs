/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;

use super::FieldValue;

/// Fields of one point, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSet {
    inner: Vec<(Cow<'static, str>, FieldValue)>,
}

impl FieldSet {
    pub fn new() -> Self {
        FieldSet::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FieldSet {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Replaces the value in place if the key is already present.
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Cow<'static, str>>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.inner.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.inner.push((key, value));
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.inner
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(k, _)| k.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.inner.iter().map(|(k, v)| (k.as_ref(), v))
    }
}
