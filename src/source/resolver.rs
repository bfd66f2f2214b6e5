//! Source locator parsing and resolution to PDF bytes

use crate::error::{Error, Result};
use base64::Engine;
use futures_util::StreamExt;
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Where a document comes from, as given by the host's source attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Local file path (plain or `file://`)
    Path(PathBuf),
    /// Remote `http(s)://` URL
    Url(String),
    /// Inline `data:...;base64,` payload
    Base64(String),
}

impl SourceLocator {
    /// Parse a raw source attribute value.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidLocator {
                locator: raw.to_string(),
            });
        }

        if let Some(rest) = raw.strip_prefix("data:") {
            let (_, payload) = rest.split_once(";base64,").ok_or_else(|| Error::InvalidLocator {
                locator: "<data>".to_string(),
            })?;
            return Ok(SourceLocator::Base64(payload.to_string()));
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(SourceLocator::Url(raw.to_string()));
        }

        if lower.starts_with("file://") {
            let path = url::Url::parse(raw)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| Error::InvalidLocator {
                    locator: raw.to_string(),
                })?;
            return Ok(SourceLocator::Path(path));
        }

        Ok(SourceLocator::Path(PathBuf::from(raw)))
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Path(path) => write!(f, "{}", path.display()),
            SourceLocator::Url(url) => f.write_str(url),
            SourceLocator::Base64(_) => f.write_str("<base64>"),
        }
    }
}

/// Limits applied while resolving a locator
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    /// Directories local paths must live in (empty allows all)
    pub resource_dirs: Vec<String>,
    /// Allow URLs that resolve to private/reserved IPs
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources
    pub max_download_bytes: u64,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Resolved PDF data
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

/// Resolve any locator to PDF bytes, reporting `(loaded, total)` progress as
/// data arrives. `total` is 0 when the size is not known up front.
pub async fn resolve<F>(
    locator: &SourceLocator,
    policy: &SourcePolicy,
    mut progress: F,
) -> Result<ResolvedPdf>
where
    F: FnMut(u64, u64) + Send,
{
    let resolved = match locator {
        SourceLocator::Path(path) => {
            validate_path_access(path, &policy.resource_dirs)?;
            resolve_path(path)?
        }
        SourceLocator::Base64(data) => resolve_base64(data)?,
        SourceLocator::Url(url) => {
            return resolve_url(
                url,
                policy.allow_private_urls,
                policy.max_download_bytes,
                progress,
            )
            .await;
        }
    };

    let len = resolved.data.len() as u64;
    progress(len, len);
    Ok(resolved)
}

fn check_pdf_header(data: &[u8], reason: &str) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: reason.to_string(),
        });
    }
    Ok(())
}

/// Validate that a path is within allowed resource directories.
/// If no resource_dirs are configured, all paths are allowed.
pub fn validate_path_access(path: &Path, resource_dirs: &[String]) -> Result<PathBuf> {
    if resource_dirs.is_empty() {
        return Ok(path.to_path_buf());
    }

    let canonical = std::fs::canonicalize(path).map_err(|_| Error::PathAccessDenied {
        path: path.display().to_string(),
    })?;

    for dir in resource_dirs {
        if let Ok(canonical_dir) = std::fs::canonicalize(dir) {
            if canonical.starts_with(&canonical_dir) {
                return Ok(canonical);
            }
        }
    }

    Err(Error::PathAccessDenied {
        path: path.display().to_string(),
    })
}

/// Resolve a file path to PDF data
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path).map_err(Error::Io)?;
    check_pdf_header(&data, "Not a valid PDF file")?;

    Ok(ResolvedPdf {
        data,
        source_name: path.display().to_string(),
    })
}

/// Resolve base64 encoded data to PDF data
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data)?;
    check_pdf_header(&data, "Decoded data is not a valid PDF file")?;

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
    })
}

/// Check if an IP address is private/reserved (loopback, link-local, private ranges, etc.)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // CGNAT 100.64/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || {
                let segments = v6.segments();
                // fc00::/7 unique local, fe80::/10 link-local
                (segments[0] & 0xFE00) == 0xFC00 || (segments[0] & 0xFFC0) == 0xFE80
            }
        }
    }
}

/// Check URL for SSRF by resolving DNS and verifying IPs are public
async fn check_ssrf(url_str: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;

    let host = parsed.host_str().ok_or_else(|| Error::SourceResolution {
        reason: "URL has no host".to_string(),
    })?;

    let port = parsed.port_or_known_default().unwrap_or(443);
    let addr_str = format!("{}:{}", host, port);

    let addrs = tokio::net::lookup_host(&addr_str)
        .await
        .map_err(|e| Error::SourceResolution {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(Error::SsrfBlocked {
                url: url_str.to_string(),
            });
        }
    }

    Ok(())
}

/// Download a URL with SSRF protection and a size cap, reporting every chunk
pub async fn resolve_url<F>(
    url: &str,
    allow_private_urls: bool,
    max_download_bytes: u64,
    mut progress: F,
) -> Result<ResolvedPdf>
where
    F: FnMut(u64, u64) + Send,
{
    if !allow_private_urls {
        check_ssrf(url).await?;
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(Error::HttpRequest)?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    let total = response.content_length().unwrap_or(0);
    if total > max_download_bytes {
        return Err(Error::DownloadTooLarge {
            size: total,
            max_size: max_download_bytes,
        });
    }

    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Error::HttpRequest)?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_download_bytes,
            });
        }
        progress(data.len() as u64, total);
    }

    check_pdf_header(&data, "Downloaded data is not a valid PDF file")?;

    Ok(ResolvedPdf {
        data,
        source_name: url.to_string(),
    })
}
