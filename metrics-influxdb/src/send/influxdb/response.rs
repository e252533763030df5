/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::send::SendError;

const DETAIL_MAX_SIZE: u64 = 4096;

#[derive(Debug)]
pub(super) struct WriteResponse {
    pub(super) code: u16,
    pub(super) detail: String,
}

impl WriteResponse {
    /// InfluxDB answers 204 on success, some proxies and v3 answer 200.
    pub(super) fn check(self) -> Result<(), SendError> {
        if self.code == 200 || self.code == 204 {
            Ok(())
        } else {
            Err(SendError::Status {
                code: self.code,
                detail: self.detail,
            })
        }
    }
}

#[derive(Default)]
struct BodyInfo {
    content_length: Option<u64>,
    chunked: bool,
}

/// Read status line and headers within `max_header_size` bytes, and keep a
/// bounded part of the body of error responses as detail.
pub(super) async fn read_response<R>(
    reader: &mut R,
    max_header_size: usize,
) -> Result<WriteResponse, SendError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line_buf = Vec::<u8>::with_capacity(256);
    let mut header_size: usize = 0;

    read_header_line(reader, &mut line_buf, max_header_size).await?;
    header_size += line_buf.len();
    let code = parse_status_line(&line_buf)?;

    let mut body = BodyInfo::default();
    loop {
        if header_size >= max_header_size {
            return Err(SendError::InvalidResponse(format!(
                "header size exceeds {max_header_size}"
            )));
        }
        line_buf.clear();
        read_header_line(reader, &mut line_buf, max_header_size - header_size).await?;
        header_size += line_buf.len();
        if line_buf == b"\r\n" || line_buf == b"\n" {
            break;
        }
        parse_header_line(&line_buf, &mut body)?;
    }

    if code == 200 || code == 204 {
        return Ok(WriteResponse {
            code,
            detail: String::new(),
        });
    }

    let limit = match body.content_length {
        Some(len) if !body.chunked => len.min(DETAIL_MAX_SIZE),
        _ => DETAIL_MAX_SIZE,
    };
    let mut detail = Vec::new();
    // the detail is best effort, a broken body still reports the status code
    let _ = reader.take(limit).read_to_end(&mut detail).await;
    let detail = String::from_utf8_lossy(&detail).trim().to_string();
    Ok(WriteResponse { code, detail })
}

async fn read_header_line<R>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    max_len: usize,
) -> Result<(), SendError>
where
    R: AsyncBufRead + Unpin,
{
    let nr = (&mut *reader)
        .take(max_len as u64)
        .read_until(b'\n', line_buf)
        .await
        .map_err(SendError::Read)?;
    if nr == 0 {
        return Err(SendError::InvalidResponse(
            "connection closed before response header end".to_string(),
        ));
    }
    if line_buf.last() != Some(&b'\n') {
        return if nr < max_len {
            Err(SendError::InvalidResponse(
                "connection closed in response header".to_string(),
            ))
        } else {
            Err(SendError::InvalidResponse(
                "too large response header".to_string(),
            ))
        };
    }
    Ok(())
}

fn parse_status_line(buf: &[u8]) -> Result<u16, SendError> {
    let line = std::str::from_utf8(buf)
        .map_err(|_| SendError::InvalidResponse("non utf-8 status line".to_string()))?
        .trim_end();
    let mut parts = line.splitn(3, ' ');
    match parts.next() {
        Some("HTTP/1.0" | "HTTP/1.1") => {}
        _ => {
            return Err(SendError::InvalidResponse(format!(
                "invalid status line: {line}"
            )));
        }
    }
    let code = parts
        .next()
        .filter(|s| s.len() == 3)
        .and_then(|s| u16::from_str(s).ok())
        .ok_or_else(|| SendError::InvalidResponse(format!("invalid status code: {line}")))?;
    Ok(code)
}

fn parse_header_line(buf: &[u8], body: &mut BodyInfo) -> Result<(), SendError> {
    let line = std::str::from_utf8(buf)
        .map_err(|_| SendError::InvalidResponse("non utf-8 header line".to_string()))?;
    let Some((name, value)) = line.split_once(':') else {
        return Err(SendError::InvalidResponse(format!(
            "invalid header line: {}",
            line.trim_end()
        )));
    };
    let value = value.trim();
    if name.eq_ignore_ascii_case("content-length") {
        let len = u64::from_str(value).map_err(|_| {
            SendError::InvalidResponse(format!("invalid content-length value: {value}"))
        })?;
        body.content_length = Some(len);
    } else if name.eq_ignore_ascii_case("transfer-encoding") {
        body.chunked = value.to_lowercase().ends_with("chunked");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn no_content() {
        let stream = tokio_test::io::Builder::new()
            .read(b"HTTP/1.1 204 No Content\r\n")
            .read(b"X-Influxdb-Version: 1.8.10\r\n\r\n")
            .build();
        let mut reader = BufReader::new(stream);
        let rsp = read_response(&mut reader, 1024).await.unwrap();
        assert_eq!(rsp.code, 204);
        assert!(rsp.check().is_ok());
    }

    #[tokio::test]
    async fn error_detail() {
        let body = br#"{"error":"unable to parse 'x': missing fields"}"#;
        let header = format!(
            "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        let stream = tokio_test::io::Builder::new()
            .read(header.as_bytes())
            .read(body)
            .build();
        let mut reader = BufReader::new(stream);
        let rsp = read_response(&mut reader, 1024).await.unwrap();
        assert_eq!(rsp.code, 400);
        assert_eq!(rsp.detail.as_bytes(), body);
        match rsp.check() {
            Err(SendError::Status { code, detail }) => {
                assert_eq!(code, 400);
                assert!(detail.contains("missing fields"));
            }
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[tokio::test]
    async fn too_large_header() {
        let stream = tokio_test::io::Builder::new()
            .read(b"HTTP/1.1 204 No Content\r\n")
            .read(b"X-Padding: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n")
            .build();
        let mut reader = BufReader::new(stream);
        let r = read_response(&mut reader, 40).await;
        assert!(matches!(r, Err(SendError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn closed_early() {
        let stream = tokio_test::io::Builder::new()
            .read(b"HTTP/1.1 204 No")
            .build();
        let mut reader = BufReader::new(stream);
        let r = read_response(&mut reader, 1024).await;
        assert!(matches!(r, Err(SendError::InvalidResponse(_))));
    }

    #[test]
    fn status_line() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\n").unwrap(), 200);
        assert_eq!(parse_status_line(b"HTTP/1.0 204\r\n").unwrap(), 204);
        assert!(parse_status_line(b"HTTP/2 200 OK\r\n").is_err());
        assert!(parse_status_line(b"HTTP/1.1 20 OK\r\n").is_err());
    }
}
