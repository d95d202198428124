// File: transport.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::config::{TargetService, TransportConfig};
use crate::errors::TimingError;
use crate::message::HttpMessage;

/// Delivers one fully formed request and returns the raw response bytes.
///
/// Any failure to obtain a response is a `TimingError::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Called once before the first timed request of a run. Work that must
    /// stay out of the measurement (name resolution) belongs here.
    async fn prepare(&self, _target: &TargetService) -> Result<(), TimingError> {
        Ok(())
    }

    async fn send(&self, target: &TargetService, request: &[u8]) -> Result<Vec<u8>, TimingError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn prepare(&self, target: &TargetService) -> Result<(), TimingError> {
        (**self).prepare(target).await
    }

    async fn send(&self, target: &TargetService, request: &[u8]) -> Result<Vec<u8>, TimingError> {
        (**self).send(target, request).await
    }
}

/// Plain TCP or TLS, one fresh connection per request, bytes written as-is.
pub struct RawTransport {
    config: TransportConfig,
    connector: TlsConnector,
    resolved: Mutex<HashMap<String, Vec<SocketAddr>>>,
}

impl RawTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TimingError> {
        let tls_config = build_tls_config(config.verify_tls())?;
        Ok(Self {
            config,
            connector: TlsConnector::from(Arc::new(tls_config)),
            resolved: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Addresses of `target`, looked up once and then served from the cache.
    pub async fn resolve(&self, target: &TargetService) -> Result<Vec<SocketAddr>, TimingError> {
        let authority = target.authority();
        if let Some(addrs) = self.cached(&authority) {
            return Ok(addrs);
        }

        let addrs: Vec<SocketAddr> =
            match timeout(self.config.connect_timeout(), lookup_host(authority.as_str())).await {
                Ok(Ok(addrs)) => addrs.collect(),
                Ok(Err(e)) => {
                    return Err(TimingError::transport(format!(
                        "could not resolve {}: {}",
                        authority, e
                    )))
                }
                Err(_) => {
                    return Err(TimingError::transport(format!(
                        "resolving {} timed out",
                        authority
                    )))
                }
            };
        if addrs.is_empty() {
            return Err(TimingError::transport(format!(
                "{} resolved to no addresses",
                authority
            )));
        }

        debug!("Resolved {} to {:?}", authority, addrs);
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(authority, addrs.clone());
        Ok(addrs)
    }

    fn cached(&self, authority: &str) -> Option<Vec<SocketAddr>> {
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(authority)
            .cloned()
    }

    async fn connect(&self, target: &TargetService) -> Result<TcpStream, TimingError> {
        let addrs = self.resolve(target).await?;
        let addr = target.authority();
        let stream = match timeout(self.config.connect_timeout(), TcpStream::connect(&addrs[..]))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TimingError::transport(format!(
                    "connection to {} failed: {}",
                    addr, e
                )))
            }
            Err(_) => {
                return Err(TimingError::transport(format!(
                    "connection to {} timed out after {}ms",
                    addr,
                    self.config.connect_timeout().as_millis()
                )))
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            trace!("Could not set TCP_NODELAY on {}: {}", addr, e);
        }
        Ok(stream)
    }

    async fn exchange<S>(
        &self,
        mut stream: S,
        request: &[u8],
        head_only: bool,
    ) -> Result<Vec<u8>, TimingError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream
            .write_all(request)
            .await
            .map_err(|e| TimingError::transport(format!("write failed: {}", e)))?;
        stream
            .flush()
            .await
            .map_err(|e| TimingError::transport(format!("flush failed: {}", e)))?;

        read_response(
            &mut stream,
            head_only,
            self.config.max_response_bytes(),
            self.config.read_timeout(),
        )
        .await
    }
}

#[async_trait]
impl Transport for RawTransport {
    async fn prepare(&self, target: &TargetService) -> Result<(), TimingError> {
        self.resolve(target).await.map(|_| ())
    }

    async fn send(&self, target: &TargetService, request: &[u8]) -> Result<Vec<u8>, TimingError> {
        let head_only = HttpMessage::parse(request)
            .method()
            .map(|m| m.eq_ignore_ascii_case("HEAD"))
            .unwrap_or(false);

        let stream = self.connect(target).await?;

        if !target.use_tls() {
            return self.exchange(stream, request, head_only).await;
        }

        let server_name = ServerName::try_from(target.host().to_string()).map_err(|e| {
            TimingError::transport(format!("invalid TLS server name {}: {}", target.host(), e))
        })?;
        let tls_stream = match timeout(
            self.config.connect_timeout(),
            self.connector.connect(server_name, stream),
        )
        .await
        {
            Ok(Ok(tls_stream)) => tls_stream,
            Ok(Err(e)) => {
                return Err(TimingError::transport(format!(
                    "TLS handshake with {} failed: {}",
                    target.authority(),
                    e
                )))
            }
            Err(_) => {
                return Err(TimingError::transport(format!(
                    "TLS handshake with {} timed out",
                    target.authority()
                )))
            }
        };

        self.exchange(tls_stream, request, head_only).await
    }
}

/// Reads until the response is complete, the peer closes, or `limit` bytes.
///
/// A read timeout or connection error before any byte arrived is a failure;
/// after that, whatever was received is the response.
pub async fn read_response<S>(
    stream: &mut S,
    head_only: bool,
    limit: usize,
    read_timeout: Duration,
) -> Result<Vec<u8>, TimingError>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    while !response_complete(&buffer, head_only) && buffer.len() < limit {
        let n = match timeout(read_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) if buffer.is_empty() => {
                return Err(TimingError::transport(format!("read failed: {}", e)))
            }
            Ok(Err(e)) => {
                debug!("Read error after {} bytes, keeping partial response: {}", buffer.len(), e);
                break;
            }
            Err(_) if buffer.is_empty() => {
                return Err(TimingError::transport(format!(
                    "no response within {}ms",
                    read_timeout.as_millis()
                )))
            }
            Err(_) => {
                debug!("Read timed out after {} bytes, keeping partial response", buffer.len());
                break;
            }
        };

        if n == 0 {
            if buffer.is_empty() {
                return Err(TimingError::transport("connection closed without a response"));
            }
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(buffer)
}

/// Whether `buffer` holds a complete HTTP/1.x response. Interim 1xx heads
/// are skipped; without a length or chunked framing the body runs to EOF.
pub fn response_complete(buffer: &[u8], head_only: bool) -> bool {
    let mut offset = 0;
    loop {
        let rest = &buffer[offset..];
        let head = HttpMessage::parse(rest);
        if !head.is_head_complete() {
            return false;
        }

        let status = head.status_code().unwrap_or(200);
        if (100..200).contains(&status) && status != 101 {
            offset += head.body_offset();
            continue;
        }
        if head_only || status == 101 || status == 204 || status == 304 {
            return true;
        }

        let body = head.body(rest);
        if head.is_chunked() {
            return chunked_body_complete(body);
        }
        return match head.content_length() {
            Some(len) => body.len() >= len,
            None => false,
        };
    }
}

/// Walks the chunk framing: size lines, data plus CRLF, then the last
/// (zero) chunk and its trailer section up to the empty line.
fn chunked_body_complete(body: &[u8]) -> bool {
    let mut pos = 0;
    loop {
        let Some(eol) = find_crlf(body, pos) else {
            return false;
        };
        let size_field = body[pos..eol].split(|b| *b == b';').next().unwrap_or_default();
        let Some(size) = std::str::from_utf8(size_field)
            .ok()
            .and_then(|s| usize::from_str_radix(s.trim(), 16).ok())
        else {
            // Malformed framing, keep reading until EOF or the limit.
            return false;
        };
        pos = eol + 2;

        if size == 0 {
            loop {
                let Some(eol) = find_crlf(body, pos) else {
                    return false;
                };
                if eol == pos {
                    return true;
                }
                pos = eol + 2;
            }
        }

        pos = match pos.checked_add(size).and_then(|p| p.checked_add(2)) {
            Some(next) if next <= body.len() => next,
            _ => return false,
        };
    }
}

fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

fn build_tls_config(verify: bool) -> Result<rustls::ClientConfig, TimingError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| TimingError::config(format!("TLS setup failed: {}", e)))?;

    let config = if verify {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    };
    Ok(config)
}

/// Certificate verifier for `--verify-tls` off: any chain is accepted, but
/// handshake signatures are still checked.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
