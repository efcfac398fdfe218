//! TLS configuration for the control plane channel.

use std::path::PathBuf;

use crate::Error;

/// Configuration for TLS connections.
///
/// By default the platform's native root certificates are trusted. Cluster
/// deployments usually pin the cluster CA and present a client identity
/// issued by it.
///
/// ## Example: Cluster CA
///
/// ```rust
/// use accessplane::TlsConfig;
///
/// let config = TlsConfig::builder()
///     .ca_cert_file("/var/lib/cluster/ca.pem")
///     .with_native_roots(false)
///     .build();
/// assert!(config.has_custom_ca());
/// ```
///
/// ## Example: Client Identity (mTLS)
///
/// ```rust
/// use accessplane::TlsConfig;
///
/// let config = TlsConfig::builder()
///     .client_cert_file("/var/lib/node/cert.pem")
///     .client_key_file("/var/lib/node/key.pem")
///     .build();
/// assert!(config.is_mtls_configured());
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct TlsConfig {
    /// Custom CA certificate file path.
    #[builder(into)]
    pub ca_cert_file: Option<PathBuf>,

    /// Custom CA certificate PEM data.
    #[builder(into)]
    pub ca_cert_pem: Option<String>,

    /// Client certificate file path (for mTLS).
    #[builder(into)]
    pub client_cert_file: Option<PathBuf>,

    /// Client key file path (for mTLS).
    #[builder(into)]
    pub client_key_file: Option<PathBuf>,

    /// Server name to verify instead of the URL host.
    #[builder(into)]
    pub domain_name: Option<String>,

    /// Whether to trust the platform's native roots.
    #[builder(default = true)]
    pub with_native_roots: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TlsConfig {
    /// Returns `true` if mTLS is configured.
    pub fn is_mtls_configured(&self) -> bool {
        self.client_cert_file.is_some() && self.client_key_file.is_some()
    }

    /// Returns `true` if custom CA is configured.
    pub fn has_custom_ca(&self) -> bool {
        self.ca_cert_file.is_some() || self.ca_cert_pem.is_some()
    }

    /// Loads the custom CA, preferring inline PEM over the file.
    pub fn load_ca_pem(&self) -> Result<Option<String>, Error> {
        if let Some(pem) = &self.ca_cert_pem {
            return Ok(Some(pem.clone()));
        }
        match &self.ca_cert_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .map_err(|e| Error::configuration(format!("failed to read CA file {}", path.display())).with_source(e)),
            None => Ok(None),
        }
    }

    /// Loads the client certificate and key PEM, if both are configured.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when only one half of the pair is set
    /// or a file cannot be read.
    pub fn load_identity_pem(&self) -> Result<Option<(String, String)>, Error> {
        match (&self.client_cert_file, &self.client_key_file) {
            (None, None) => Ok(None),
            (Some(cert), Some(key)) => {
                let cert_pem = std::fs::read_to_string(cert).map_err(|e| {
                    Error::configuration(format!("failed to read client certificate {}", cert.display()))
                        .with_source(e)
                })?;
                let key_pem = std::fs::read_to_string(key).map_err(|e| {
                    Error::configuration(format!("failed to read client key {}", key.display()))
                        .with_source(e)
                })?;
                Ok(Some((cert_pem, key_pem)))
            }
            _ => Err(Error::configuration(
                "client certificate and key must be configured together",
            )),
        }
    }

    #[cfg(feature = "grpc")]
    pub(crate) fn to_client_tls(&self) -> Result<tonic::transport::ClientTlsConfig, Error> {
        use tonic::transport::{Certificate, ClientTlsConfig, Identity};

        let mut tls = ClientTlsConfig::new();
        if self.with_native_roots {
            tls = tls.with_native_roots();
        }
        if let Some(pem) = self.load_ca_pem()? {
            tls = tls.ca_certificate(Certificate::from_pem(pem));
        }
        if let Some((cert, key)) = self.load_identity_pem()? {
            tls = tls.identity(Identity::from_pem(cert, key));
        }
        if let Some(domain) = &self.domain_name {
            tls = tls.domain_name(domain.clone());
        }
        Ok(tls)
    }
}
