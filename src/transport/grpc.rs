//! gRPC transport implementation using tonic.
//!
//! Every stream is multiplexed over one HTTP/2 [`Channel`]. Outbound legs
//! are fed from an mpsc queue wrapped in a [`ReceiverStream`]; calls whose
//! response only completes once the outbound leg ends are opened lazily,
//! when the inbound leg is first polled.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic_prost::ProstCodec;
use url::Url;

use super::proto::{
    AuditStreamRequest, WatchRequest, WireEvent, WireKeepAlive, WireStreamStatus,
};
use super::traits::{BidiStream, InboundStream, OUTBOUND_BUFFER, StreamTransport, Transport};
use crate::config::{ConnectionConfig, TlsConfig};
use crate::{Error, ErrorKind};

const WATCH_EVENTS: &str = "/proto.AuthService/WatchEvents";
const SEND_KEEP_ALIVES: &str = "/proto.AuthService/SendKeepAlives";
const CREATE_AUDIT_STREAM: &str = "/proto.AuthService/CreateAuditStream";

/// gRPC transport client using tonic.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    channel: Channel,
    open_timeout: Duration,
}

impl GrpcTransport {
    /// Creates a transport whose channel connects on first use.
    ///
    /// TLS is applied for `https` URLs. Must be called from within a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is not a valid endpoint or
    /// the TLS material cannot be loaded.
    pub fn connect_lazy(
        url: &Url,
        tls: &TlsConfig,
        connection: &ConnectionConfig,
    ) -> Result<Self, Error> {
        let mut endpoint = Endpoint::from_shared(url.to_string())
            .map_err(|e| Error::configuration(format!("invalid endpoint {}", url)).with_source(e))?
            .connect_timeout(connection.connect_timeout)
            .http2_keep_alive_interval(connection.http2_keep_alive_interval)
            .keep_alive_timeout(connection.keep_alive_timeout)
            .keep_alive_while_idle(true)
            .tcp_keepalive(connection.tcp_keepalive);

        if url.scheme() == "https" {
            endpoint = endpoint
                .tls_config(tls.to_client_tls()?)
                .map_err(|e| Error::configuration("invalid TLS configuration").with_source(e))?;
        }

        tracing::debug!(url = %url, tls = url.scheme() == "https", "created lazy gRPC channel");
        Ok(Self {
            channel: endpoint.connect_lazy(),
            open_timeout: connection.open_timeout,
        })
    }

    async fn ready(&self) -> Result<tonic::client::Grpc<Channel>, Error> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        match tokio::time::timeout(self.open_timeout, grpc.ready()).await {
            Ok(Ok(())) => Ok(grpc),
            Ok(Err(e)) => {
                Err(Error::connection(format!("service was not ready: {}", e)).with_source(e))
            }
            Err(_) => Err(Error::new(
                ErrorKind::Timeout,
                "timed out waiting for the service to become ready",
            )),
        }
    }
}

#[async_trait::async_trait]
impl StreamTransport for GrpcTransport {
    async fn watch_events(&self, request: WatchRequest) -> Result<InboundStream<WireEvent>, Error> {
        let mut grpc = self.ready().await?;
        let codec: ProstCodec<WatchRequest, WireEvent> = ProstCodec::default();
        let response = grpc
            .server_streaming(
                tonic::Request::new(request),
                PathAndQuery::from_static(WATCH_EVENTS),
                codec,
            )
            .await?;
        Ok(response
            .into_inner()
            .map(|event| event.map_err(Error::from))
            .boxed())
    }

    async fn send_keep_alives(&self) -> Result<BidiStream<WireKeepAlive, ()>, Error> {
        let mut grpc = self.ready().await?;
        let (sender, outbound) = mpsc::channel(OUTBOUND_BUFFER);
        let call = async move {
            let codec: ProstCodec<WireKeepAlive, ()> = ProstCodec::default();
            grpc.client_streaming(
                tonic::Request::new(ReceiverStream::new(outbound)),
                PathAndQuery::from_static(SEND_KEEP_ALIVES),
                codec,
            )
            .await
            .map(tonic::Response::into_inner)
            .map_err(Error::from)
        };
        Ok(BidiStream::new(sender, futures::stream::once(call).boxed()))
    }

    async fn create_audit_stream(
        &self,
    ) -> Result<BidiStream<AuditStreamRequest, WireStreamStatus>, Error> {
        let mut grpc = self.ready().await?;
        let (sender, outbound) = mpsc::channel(OUTBOUND_BUFFER);
        let call = async move {
            let codec: ProstCodec<AuditStreamRequest, WireStreamStatus> = ProstCodec::default();
            grpc.streaming(
                tonic::Request::new(ReceiverStream::new(outbound)),
                PathAndQuery::from_static(CREATE_AUDIT_STREAM),
                codec,
            )
            .await
            .map(tonic::Response::into_inner)
            .map_err(Error::from)
        };
        let receiver = futures::stream::once(call)
            .map(|opened| -> InboundStream<WireStreamStatus> {
                match opened {
                    Ok(statuses) => statuses.map(|status| status.map_err(Error::from)).boxed(),
                    Err(err) => futures::stream::once(futures::future::ready(Err(err))).boxed(),
                }
            })
            .flatten()
            .boxed();
        Ok(BidiStream::new(sender, receiver))
    }

    fn transport_type(&self) -> Transport {
        Transport::Grpc
    }
}
