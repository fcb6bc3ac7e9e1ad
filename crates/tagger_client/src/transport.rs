//! Transport layer: the one unary RPC this client needs, behind an
//! object-safe trait so sessions can be exercised against test doubles.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::proto::{ModelInferRequest, ModelInferResponse, MODEL_INFER_PATH};

/// Failure of a single remote call, before it is wrapped into the
/// client-level [`crate::Error`].
#[derive(Debug, Error)]
pub enum TransportFault {
    #[error("rpc failed: {0}")]
    Call(#[from] tonic::Status),

    #[error("connection failed: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("call exceeded deadline of {0:?}")]
    Timeout(Duration),
}

/// A handle able to issue `ModelInfer` calls against an inference service.
///
/// One handle belongs to exactly one session; handles are not shared
/// across sessions, so dropping one never disturbs another session's
/// connection.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn model_infer(
        &self,
        request: ModelInferRequest,
    ) -> std::result::Result<ModelInferResponse, TransportFault>;
}

/// tonic-backed transport speaking to a Triton gRPC endpoint.
pub struct GrpcTransport {
    inner: Grpc<Channel>,
    deadline: Option<Duration>,
}

impl GrpcTransport {
    /// Open a channel to `host:port`.
    ///
    /// `deadline` bounds each call; `None` lets a hung server block the
    /// caller indefinitely, so production callers should set one.
    pub async fn connect(
        host: &str,
        port: u16,
        deadline: Option<Duration>,
    ) -> std::result::Result<Self, TransportFault> {
        let endpoint = Endpoint::from_shared(format!("http://{host}:{port}"))?;
        let channel = endpoint.connect().await?;
        debug!(host, port, "connected to inference service");
        Ok(Self {
            inner: Grpc::new(channel),
            deadline,
        })
    }

    async fn call(
        &self,
        request: ModelInferRequest,
    ) -> std::result::Result<ModelInferResponse, TransportFault> {
        // Channel is cheap to clone; Grpc needs &mut for the call itself.
        let mut grpc = self.inner.clone();
        grpc.ready().await?;
        let codec: ProstCodec<ModelInferRequest, ModelInferResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(MODEL_INFER_PATH);
        let response = grpc.unary(tonic::Request::new(request), path, codec).await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl InferenceTransport for GrpcTransport {
    async fn model_infer(
        &self,
        request: ModelInferRequest,
    ) -> std::result::Result<ModelInferResponse, TransportFault> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.call(request))
                .await
                .map_err(|_| TransportFault::Timeout(deadline))?,
            None => self.call(request).await,
        }
    }
}
