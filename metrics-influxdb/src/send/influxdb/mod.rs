/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use http::uri::PathAndQuery;
use http::{HeaderMap, HeaderValue, header};
use log::debug;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use super::{SendError, Sender};
use crate::config::InfluxdbConfig;
use crate::protocol::LineBatch;

mod response;
use response::read_response;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

struct TlsTarget {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

/// Writes batches to the InfluxDB HTTP write API, one connection per batch.
pub struct InfluxdbHttpSender {
    peer: String,
    api_path: PathAndQuery,
    static_headers: HeaderMap,
    tls: Option<TlsTarget>,
    timeout: Duration,
    connect_timeout: Duration,
    rsp_header_max_size: usize,
}

impl InfluxdbHttpSender {
    pub fn new(config: &InfluxdbConfig) -> anyhow::Result<Self> {
        let api_path = config.build_api_path()?;

        let mut static_headers = HeaderMap::new();
        static_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        static_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        static_headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        if let Some(v) = config.build_auth_header()? {
            static_headers.insert(header::AUTHORIZATION, v);
        }

        let tls = if config.is_tls() {
            Some(build_tls_target(&config.host)?)
        } else {
            None
        };

        Ok(InfluxdbHttpSender {
            peer: config.peer(),
            api_path,
            static_headers,
            tls,
            timeout: config.timeout,
            connect_timeout: config.connect_timeout,
            rsp_header_max_size: config.rsp_header_max_size,
        })
    }

    #[inline]
    pub fn api_path(&self) -> &PathAndQuery {
        &self.api_path
    }

    async fn connect(&self) -> Result<TcpStream, SendError> {
        let addrs = tokio::net::lookup_host(&self.peer)
            .await
            .map_err(|e| SendError::Resolve {
                peer: self.peer.clone(),
                source: e,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!("failed to connect to {addr}: {e}");
                    last_err = Some(SendError::Connect { addr, source: e });
                }
                Err(_) => {
                    debug!("timed out connecting to {addr}");
                    last_err = Some(SendError::Connect {
                        addr,
                        source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                    });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SendError::NoAddress(self.peer.clone())))
    }

    fn write_fixed_header(&self, header_buf: &mut Vec<u8>, body_len: usize) {
        header_buf.extend_from_slice(b"POST ");
        header_buf.extend_from_slice(self.api_path.as_str().as_bytes());
        header_buf.extend_from_slice(b" HTTP/1.1\r\n");
        header_buf.extend_from_slice(b"Host: ");
        header_buf.extend_from_slice(self.peer.as_bytes());
        header_buf.extend_from_slice(b"\r\n");
        header_buf.extend_from_slice(b"Connection: close\r\n");
        for (header, value) in &self.static_headers {
            header_buf.extend_from_slice(header.as_str().as_bytes());
            header_buf.extend_from_slice(b": ");
            header_buf.extend_from_slice(value.as_bytes());
            header_buf.extend_from_slice(b"\r\n");
        }
        header_buf.extend_from_slice(b"Content-Length: ");
        header_buf.extend_from_slice(itoa::Buffer::new().format(body_len).as_bytes());
        header_buf.extend_from_slice(b"\r\n\r\n");
    }

    async fn post<S>(&self, stream: S, body: &[u8]) -> Result<(), SendError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);

        let mut header_buf = Vec::with_capacity(512);
        self.write_fixed_header(&mut header_buf, body.len());
        stream
            .write_all(&header_buf)
            .await
            .map_err(SendError::Write)?;
        stream.write_all(body).await.map_err(SendError::Write)?;
        stream.flush().await.map_err(SendError::Write)?;

        let rsp = read_response(&mut stream, self.rsp_header_max_size).await?;
        rsp.check()
    }

    async fn send_body(&self, body: &[u8]) -> Result<(), SendError> {
        let stream = self.connect().await?;
        match &self.tls {
            Some(tls) => {
                let tls_stream = tls
                    .connector
                    .connect(tls.server_name.clone(), stream)
                    .await
                    .map_err(SendError::Tls)?;
                self.post(tls_stream, body).await
            }
            None => self.post(stream, body).await,
        }
    }
}

impl Sender for InfluxdbHttpSender {
    async fn send(&self, batch: &LineBatch) -> Result<(), SendError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = batch.to_body();
        match tokio::time::timeout(self.timeout, self.send_body(&body)).await {
            Ok(r) => r,
            Err(_) => Err(SendError::Timeout(self.timeout)),
        }
    }
}

fn build_tls_target(host: &str) -> anyhow::Result<TlsTarget> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| anyhow!("failed to build tls client config: {e}"))?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| anyhow!("invalid tls server name {host}: {e}"))?;
    Ok(TlsTarget {
        connector: TlsConnector::from(Arc::new(config)),
        server_name,
    })
}
