/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use memchr::{memchr2, memchr3};

#[inline]
pub(super) fn has_newline(s: &str) -> bool {
    memchr2(b'\n', b'\r', s.as_bytes()).is_some()
}

/// Measurement names escape comma and space.
pub(super) fn push_measurement(buf: &mut String, s: &str) {
    if memchr2(b',', b' ', s.as_bytes()).is_none() {
        buf.push_str(s);
        return;
    }
    for c in s.chars() {
        if matches!(c, ',' | ' ') {
            buf.push('\\');
        }
        buf.push(c);
    }
}

/// Tag keys, tag values and field keys escape comma, equals sign and space.
pub(super) fn push_key(buf: &mut String, s: &str) {
    if memchr3(b',', b'=', b' ', s.as_bytes()).is_none() {
        buf.push_str(s);
        return;
    }
    for c in s.chars() {
        if matches!(c, ',' | '=' | ' ') {
            buf.push('\\');
        }
        buf.push(c);
    }
}
