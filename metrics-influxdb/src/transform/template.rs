/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;

use super::{Measurement, MeasurementTransformer, TransformError};
use crate::types::TagMap;

const TOKEN_MEASUREMENT: &str = "measurement";
const TOKEN_MEASUREMENT_REST: &str = "measurement*";
const TOKEN_ANY: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Measurement,
    MeasurementRest,
    Tag(String),
}

/// Splits dotted metric names by a template such as `service.measurement.host`.
///
/// `measurement` and `*` keep the segment in the measurement name,
/// `measurement*` keeps the segment and every following one, any other token
/// makes the segment the value of a tag with that name.
#[derive(Clone, Debug)]
pub struct TemplateTransformer {
    template: String,
    tokens: Vec<Token>,
}

impl TemplateTransformer {
    pub fn new(template: &str) -> anyhow::Result<Self> {
        if template.is_empty() {
            return Err(anyhow!("empty template"));
        }

        let parts: Vec<&str> = template.split('.').collect();
        let mut tokens = Vec::with_capacity(parts.len());
        let mut has_measurement = false;
        for (i, part) in parts.iter().enumerate() {
            let token = match *part {
                "" => return Err(anyhow!("empty token in template {template}")),
                TOKEN_MEASUREMENT | TOKEN_ANY => Token::Measurement,
                TOKEN_MEASUREMENT_REST => {
                    if i + 1 != parts.len() {
                        return Err(anyhow!(
                            "{TOKEN_MEASUREMENT_REST} should be the last token in template {template}"
                        ));
                    }
                    Token::MeasurementRest
                }
                tag => {
                    if tokens.contains(&Token::Tag(tag.to_string())) {
                        return Err(anyhow!("duplicate tag {tag} in template {template}"));
                    }
                    Token::Tag(tag.to_string())
                }
            };
            if !matches!(token, Token::Tag(_)) {
                has_measurement = true;
            }
            tokens.push(token);
        }
        if !has_measurement {
            return Err(anyhow!("no measurement token in template {template}"));
        }

        Ok(TemplateTransformer {
            template: template.to_string(),
            tokens,
        })
    }

    fn mismatch(&self, metric_name: &str) -> TransformError {
        TransformError::TemplateMismatch {
            name: metric_name.to_string(),
            template: self.template.clone(),
        }
    }
}

impl MeasurementTransformer for TemplateTransformer {
    fn transform(&self, metric_name: &str) -> Result<Measurement, TransformError> {
        let segments: Vec<&str> = metric_name.split('.').collect();
        let greedy = matches!(self.tokens.last(), Some(Token::MeasurementRest));
        if segments.len() < self.tokens.len() || (!greedy && segments.len() > self.tokens.len())
        {
            return Err(self.mismatch(metric_name));
        }

        let mut name_parts: Vec<&str> = Vec::with_capacity(segments.len());
        let mut tags = TagMap::new();
        for (i, token) in self.tokens.iter().enumerate() {
            let segment = segments[i];
            if segment.is_empty() {
                return Err(self.mismatch(metric_name));
            }
            match token {
                Token::Measurement => name_parts.push(segment),
                Token::MeasurementRest => {
                    let rest = &segments[i..];
                    if rest.iter().any(|s| s.is_empty()) {
                        return Err(self.mismatch(metric_name));
                    }
                    name_parts.extend_from_slice(rest);
                }
                Token::Tag(key) => {
                    tags.insert(key.as_str(), segment);
                }
            }
        }

        Ok(Measurement::with_tags(name_parts.join("."), tags))
    }
}
