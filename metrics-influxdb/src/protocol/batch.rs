/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// Encoded points of one reporting cycle, in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineBatch {
    lines: Vec<String>,
}

impl LineBatch {
    pub fn new() -> Self {
        LineBatch::default()
    }

    #[inline]
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Request body, every line newline terminated.
    pub fn to_body(&self) -> Vec<u8> {
        let size = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut buf = Vec::with_capacity(size);
        for line in &self.lines {
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        buf
    }
}

impl FromIterator<String> for LineBatch {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        LineBatch {
            lines: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body() {
        let batch: LineBatch = ["a value=1i", "b value=2i"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.to_body(), b"a value=1i\nb value=2i\n");
        assert!(LineBatch::new().to_body().is_empty());
    }
}
