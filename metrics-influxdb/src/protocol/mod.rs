/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::Write;

use log::debug;
use thiserror::Error;

use crate::types::{FieldSet, TagMap};

mod escape;

mod precision;
pub use precision::TimestampPrecision;

mod batch;
pub use batch::LineBatch;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("empty measurement name")]
    EmptyMeasurement,
    #[error("no valid field left")]
    NoFields,
    #[error("newline found in {0}")]
    Newline(&'static str),
    #[error("empty tag key")]
    EmptyTagKey,
    #[error("empty field key")]
    EmptyFieldKey,
    #[error("trailing backslash in {0}")]
    TrailingBackslash(&'static str),
}

/// Encode one point as a single line without the trailing newline.
///
/// Fields whose value can not be represented on the wire (non-finite floats,
/// unsigned values beyond i64) are left out. Tags with empty values are left
/// out as well.
pub fn encode(
    measurement: &str,
    tags: &TagMap,
    fields: &FieldSet,
    timestamp: Option<i64>,
) -> Result<String, EncodeError> {
    if measurement.is_empty() {
        return Err(EncodeError::EmptyMeasurement);
    }
    if escape::has_newline(measurement) {
        return Err(EncodeError::Newline("measurement"));
    }
    // a trailing backslash would escape the separator that follows
    if measurement.ends_with('\\') {
        return Err(EncodeError::TrailingBackslash("measurement"));
    }

    let mut buf = String::with_capacity(measurement.len() + 16 * (tags.len() + fields.len()));
    escape::push_measurement(&mut buf, measurement);

    for (key, value) in tags.iter() {
        if key.is_empty() {
            return Err(EncodeError::EmptyTagKey);
        }
        if value.is_empty() {
            continue;
        }
        if escape::has_newline(key) || escape::has_newline(value) {
            return Err(EncodeError::Newline("tag"));
        }
        if key.ends_with('\\') || value.ends_with('\\') {
            return Err(EncodeError::TrailingBackslash("tag"));
        }
        buf.push(',');
        escape::push_key(&mut buf, key);
        buf.push('=');
        escape::push_key(&mut buf, value);
    }

    let mut field_count = 0usize;
    for (key, value) in fields.iter() {
        if key.is_empty() {
            return Err(EncodeError::EmptyFieldKey);
        }
        if escape::has_newline(key) {
            return Err(EncodeError::Newline("field key"));
        }
        if key.ends_with('\\') {
            return Err(EncodeError::TrailingBackslash("field key"));
        }
        if let Err(e) = value.check() {
            debug!("{measurement}: drop field {key}: {e}");
            continue;
        }
        buf.push(if field_count == 0 { ' ' } else { ',' });
        escape::push_key(&mut buf, key);
        buf.push('=');
        let _ = write!(buf, "{}", value.display_influxdb());
        field_count += 1;
    }
    if field_count == 0 {
        return Err(EncodeError::NoFields);
    }

    if let Some(ts) = timestamp {
        buf.push(' ');
        buf.push_str(itoa::Buffer::new().format(ts));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn fields(list: &[(&'static str, FieldValue)]) -> FieldSet {
        let mut set = FieldSet::new();
        for (k, v) in list {
            set.push(*k, v.clone());
        }
        set
    }

    #[test]
    fn simple() {
        let line = encode(
            "requests",
            &TagMap::new(),
            &fields(&[("count", FieldValue::Integer(1))]),
            None,
        )
        .unwrap();
        assert_eq!(line, "requests count=1i");
    }

    #[test]
    fn tags_and_timestamp() {
        let tags: TagMap = [("host", "web 1"), ("dc", "eu")].into_iter().collect();
        let line = encode(
            "cpu load",
            &tags,
            &fields(&[
                ("value", FieldValue::Float(0.5)),
                ("state", FieldValue::Text("ok".to_string())),
            ]),
            Some(1_700_000_000_000),
        )
        .unwrap();
        assert_eq!(
            line,
            r#"cpu\ load,dc=eu,host=web\ 1 value=0.5,state="ok" 1700000000000"#
        );
    }

    #[test]
    fn every_field_once() {
        let set = fields(&[
            ("count", FieldValue::Integer(3)),
            ("min", FieldValue::Float(1.0)),
            ("max", FieldValue::Float(2.0)),
            ("run-count", FieldValue::Unsigned(3)),
        ]);
        let line = encode("h", &TagMap::new(), &set, None).unwrap();
        assert!(line.starts_with("h "));
        let written: Vec<&str> = line[2..]
            .split(',')
            .filter_map(|kv| kv.split_once('=').map(|(k, _)| k))
            .collect();
        assert_eq!(written, set.keys().collect::<Vec<_>>());
        assert!(line.contains("count=3i"));
        assert!(line.contains("min=1.0,"));
        assert!(line.contains("run-count=3i"));
    }

    #[test]
    fn drop_invalid_fields() {
        let line = encode(
            "g",
            &TagMap::new(),
            &fields(&[
                ("nan", FieldValue::Float(f64::NAN)),
                ("big", FieldValue::Unsigned(u64::MAX)),
                ("note", FieldValue::Text("a\0b".to_string())),
                ("value", FieldValue::Float(2.5)),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(line, "g value=2.5");

        let e = encode(
            "g",
            &TagMap::new(),
            &fields(&[("value", FieldValue::Float(f64::INFINITY))]),
            None,
        )
        .unwrap_err();
        assert_eq!(e, EncodeError::NoFields);
    }

    #[test]
    fn reject() {
        let set = fields(&[("value", FieldValue::Integer(0))]);
        assert_eq!(
            encode("", &TagMap::new(), &set, None).unwrap_err(),
            EncodeError::EmptyMeasurement
        );
        assert_eq!(
            encode("a\nb", &TagMap::new(), &set, None).unwrap_err(),
            EncodeError::Newline("measurement")
        );
        assert_eq!(
            encode("m", &TagMap::new(), &FieldSet::new(), None).unwrap_err(),
            EncodeError::NoFields
        );

        let tags: TagMap = [("", "x")].into_iter().collect();
        assert_eq!(
            encode("m", &tags, &set, None).unwrap_err(),
            EncodeError::EmptyTagKey
        );

        let set = fields(&[("", FieldValue::Integer(0))]);
        assert_eq!(
            encode("m", &TagMap::new(), &set, None).unwrap_err(),
            EncodeError::EmptyFieldKey
        );
    }

    #[test]
    fn trailing_backslash() {
        let set = fields(&[("value", FieldValue::Integer(1))]);
        let tags: TagMap = [("path", "C:\\")].into_iter().collect();
        assert_eq!(
            encode("disk", &tags, &set, None).unwrap_err(),
            EncodeError::TrailingBackslash("tag")
        );
        let tags: TagMap = [("dir\\", "C")].into_iter().collect();
        assert_eq!(
            encode("disk", &tags, &set, None).unwrap_err(),
            EncodeError::TrailingBackslash("tag")
        );
        assert_eq!(
            encode("disk\\", &TagMap::new(), &set, None).unwrap_err(),
            EncodeError::TrailingBackslash("measurement")
        );
        let bad = fields(&[("value\\", FieldValue::Integer(1))]);
        assert_eq!(
            encode("disk", &TagMap::new(), &bad, None).unwrap_err(),
            EncodeError::TrailingBackslash("field key")
        );

        // inner backslashes are kept as they are
        let tags: TagMap = [("path", "C:\\tmp")].into_iter().collect();
        let line = encode("disk", &tags, &set, None).unwrap();
        assert_eq!(line, r"disk,path=C:\tmp value=1i");
    }

    #[test]
    fn empty_tag_value() {
        let tags: TagMap = [("host", ""), ("dc", "eu")].into_iter().collect();
        let set = fields(&[("value", FieldValue::Integer(0))]);
        let line = encode("m", &tags, &set, None).unwrap();
        assert_eq!(line, "m,dc=eu value=0i");
    }
}
