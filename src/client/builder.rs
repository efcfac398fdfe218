//! Client builder with typestate pattern.

use std::{marker::PhantomData, sync::Arc};

use super::inner::ClientInner;
#[cfg(feature = "grpc")]
use crate::transport::GrpcTransport;
use crate::{
    Client, Error,
    config::{ConnectionConfig, TlsConfig},
    marshal::{CodecRegistry, MarshalOptions},
    tracing_support::StreamMetrics,
    transport::StreamTransport,
};

/// Marker type: URL not yet provided.
pub struct NoUrl;

/// Marker type: URL has been provided.
pub struct HasUrl;

/// Builder for creating [`Client`] instances.
///
/// Uses the typestate pattern to ensure the control plane URL is provided
/// at compile time.
///
/// ## Required Configuration
///
/// - `url()`: The control plane's gRPC endpoint
///
/// ## Optional Configuration
///
/// - `tls_config()`: CA and client identity
/// - `connection_config()`: Timeouts and keep-alives
/// - `registry()`: Codec registry, e.g. with extra or replaced codecs
/// - `metrics()`: Counters to share with other clients
/// - `event_decode_options()`: Options watch payloads are decoded with
///
/// ## Example
///
/// ```rust,ignore
/// use accessplane::{Client, TlsConfig};
///
/// let client = Client::builder()
///     .url("https://auth.example.com:3025")
///     .tls_config(
///         TlsConfig::builder()
///             .ca_cert_file("/var/lib/node/ca.pem")
///             .client_cert_file("/var/lib/node/cert.pem")
///             .client_key_file("/var/lib/node/key.pem")
///             .build(),
///     )
///     .build()
///     .await?;
/// ```
pub struct ClientBuilder<UrlState> {
    url: Option<String>,
    tls_config: TlsConfig,
    connection_config: ConnectionConfig,
    registry: Option<Arc<CodecRegistry>>,
    metrics: Option<StreamMetrics>,
    event_decode_options: Option<MarshalOptions>,
    insecure: bool,
    _url_state: PhantomData<UrlState>,
}

impl ClientBuilder<NoUrl> {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            url: None,
            tls_config: TlsConfig::default(),
            connection_config: ConnectionConfig::default(),
            registry: None,
            metrics: None,
            event_decode_options: None,
            insecure: false,
            _url_state: PhantomData,
        }
    }

    /// Sets the control plane URL.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let builder = Client::builder().url("https://auth.example.com:3025");
    /// ```
    pub fn url(self, url: impl Into<String>) -> ClientBuilder<HasUrl> {
        ClientBuilder {
            url: Some(url.into()),
            tls_config: self.tls_config,
            connection_config: self.connection_config,
            registry: self.registry,
            metrics: self.metrics,
            event_decode_options: self.event_decode_options,
            insecure: self.insecure,
            _url_state: PhantomData,
        }
    }
}

impl Default for ClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> ClientBuilder<U> {
    /// Sets the TLS configuration.
    #[must_use]
    pub fn tls_config(mut self, config: TlsConfig) -> Self {
        self.tls_config = config;
        self
    }

    /// Sets the connection configuration.
    #[must_use]
    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Sets the codec registry the client decodes resources with.
    #[must_use]
    pub fn registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the metrics every stream of the client counts into.
    #[must_use]
    pub fn metrics(mut self, metrics: StreamMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the options watch payloads are decoded with.
    ///
    /// Defaults to skipping the schema check.
    #[must_use]
    pub fn event_decode_options(mut self, options: MarshalOptions) -> Self {
        self.event_decode_options = Some(options);
        self
    }

    /// Allows plaintext `http` URLs.
    ///
    /// **WARNING**: Only use this for local development.
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }
}

impl ClientBuilder<HasUrl> {
    /// Builds the client over a gRPC channel.
    ///
    /// The channel connects lazily, on the first stream opened.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid, uses `http`
    /// without [`insecure`](Self::insecure), or the TLS material cannot be
    /// loaded.
    #[cfg(feature = "grpc")]
    pub async fn build(self) -> Result<Client, Error> {
        let url = self.validated_url()?;
        let transport = GrpcTransport::connect_lazy(&url, &self.tls_config, &self.connection_config)?;
        Ok(self.finish(url, Arc::new(transport)))
    }

    /// Builds the client over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid.
    pub async fn build_with_transport(
        self,
        transport: Arc<dyn StreamTransport>,
    ) -> Result<Client, Error> {
        let url = self.validated_url()?;
        Ok(self.finish(url, transport))
    }

    fn validated_url(&self) -> Result<url::Url, Error> {
        let url = self.url.as_deref().ok_or_else(|| Error::configuration("URL is required"))?;
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::configuration(format!("invalid URL: {}", e)).with_source(e))?;

        match parsed.scheme() {
            "https" => Ok(parsed),
            "http" if self.insecure => Ok(parsed),
            "http" => Err(Error::configuration(
                "HTTPS is required. Use .insecure() for development with HTTP.",
            )),
            other => Err(Error::configuration(format!("unsupported URL scheme {:?}", other))),
        }
    }

    fn finish(self, url: url::Url, transport: Arc<dyn StreamTransport>) -> Client {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CodecRegistry::with_defaults()));
        tracing::debug!(
            url = %url,
            transport = %transport.transport_type(),
            kinds = ?registry.kinds(),
            "built client"
        );
        Client::from_inner(ClientInner {
            url: Some(url),
            transport,
            registry,
            metrics: self.metrics.unwrap_or_default(),
            event_decode_options: self
                .event_decode_options
                .unwrap_or_else(|| MarshalOptions::new().skip_validation()),
        })
    }
}
