//! Sequence inference client: lifecycle enforcement, request building,
//! response decoding.
//!
//! A [`QuestionAnswerClient`] owns one transport handle and one sequence
//! id, and walks the remote sequence through its lifecycle:
//! `start()` → any number of `infer()` calls → `stop()` → `close()`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::codec;
use crate::error::{Error, Result};
use crate::proto::{
    InferInputTensor, InferParameter, InferRequestedOutputTensor, InferTensorContents,
    ModelInferRequest,
};
use crate::transport::{GrpcTransport, InferenceTransport, TransportFault};

/// Configuration for a sequence inference session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub model_name: String,
    /// Name of the input tensor carrying the request text.
    pub input_name: String,
    /// Name of the first requested output (the answer text).
    pub output_text_name: String,
    /// Name of the second requested output (the confidence score).
    pub output_score_name: String,
    /// Bytes to skip at the front of the text output before reading UTF-8.
    /// Triton prefixes BYTES outputs with a 4-byte element length header.
    pub text_prefix_skip: usize,
    /// Per-call deadline; `None` disables the timeout entirely.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9001,
            model_name: "sentence_tagger".to_string(),
            input_name: "text_in".to_string(),
            output_text_name: "text_out".to_string(),
            output_score_name: "score".to_string(),
            text_prefix_skip: 4,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientConfig {
    /// Create a new ClientConfig targeting a specific server and model
    pub fn new(host: impl Into<String>, port: u16, model_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Set the per-call deadline
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the input tensor name
    pub fn with_input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = name.into();
        self
    }

    /// Set the requested output tensor names
    pub fn with_output_names(
        mut self,
        text: impl Into<String>,
        score: impl Into<String>,
    ) -> Self {
        self.output_text_name = text.into();
        self.output_score_name = score.into();
        self
    }

    /// Set the number of header bytes skipped in the text output
    pub fn with_text_prefix_skip(mut self, skip: usize) -> Self {
        self.text_prefix_skip = skip;
        self
    }
}

/// Lifecycle phase of a sequence session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unstarted,
    Active,
    Stopped,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unstarted => "unstarted",
            Phase::Active => "active",
            Phase::Stopped => "stopped",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Answer predicted for one input line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub answer: String,
    pub confidence: f32,
}

enum SequenceControl {
    Start,
    Stop,
}

impl SequenceControl {
    fn command(&self) -> &'static str {
        match self {
            SequenceControl::Start => "START",
            SequenceControl::Stop => "STOP",
        }
    }
}

struct SessionState {
    phase: Phase,
    transport: Option<Box<dyn InferenceTransport>>,
}

/// Client for a stateful question-answering sequence on a remote
/// inference server.
///
/// Every request carries the session's sequence id plus start/end flags,
/// which is how the stateless unary RPC is turned into a conversation.
/// Calls are serialized by an internal mutex so that concurrent `infer()`
/// invocations reach the server in a deterministic order; the remote
/// model is stateful per sequence id and out-of-order arrival would
/// corrupt its context.
pub struct QuestionAnswerClient {
    config: ClientConfig,
    sequence_id: i64,
    state: Mutex<SessionState>,
}

impl QuestionAnswerClient {
    /// Open a gRPC connection and bind it to `sequence_id`.
    ///
    /// The id must be unique among sessions concurrently active against
    /// the same server; colliding ids corrupt each other's remote state.
    pub async fn connect(config: ClientConfig, sequence_id: i64) -> Result<Self> {
        let transport =
            GrpcTransport::connect(&config.host, config.port, config.request_timeout)
                .await
                .map_err(|fault| Error::Transport {
                    operation: "connect",
                    fault,
                    request: String::new(),
                })?;
        Ok(Self::with_transport(config, sequence_id, Box::new(transport)))
    }

    /// Build a client over an already-open transport.
    pub fn with_transport(
        config: ClientConfig,
        sequence_id: i64,
        transport: Box<dyn InferenceTransport>,
    ) -> Self {
        Self {
            config,
            sequence_id,
            state: Mutex::new(SessionState {
                phase: Phase::Unstarted,
                transport: Some(transport),
            }),
        }
    }

    pub fn sequence_id(&self) -> i64 {
        self.sequence_id
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Current lifecycle phase (mainly useful for diagnostics and tests).
    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Begin the remote sequence.
    ///
    /// Sends the "START" control call with `sequence_start` set. Legal
    /// only in the unstarted phase; on transport failure the session
    /// stays unstarted so the call may be retried by the caller.
    pub async fn start(&self) -> Result<String> {
        self.control(SequenceControl::Start).await
    }

    /// End the remote sequence with the "STOP" control call.
    pub async fn stop(&self) -> Result<String> {
        self.control(SequenceControl::Stop).await
    }

    /// Ask the model to tag one line of text.
    ///
    /// Legal only while the sequence is active. A transport failure here
    /// releases the connection (fail-fast): the remote sequence state is
    /// unknown after a lost call, so the session refuses further work
    /// rather than continuing on a possibly corrupted conversation.
    pub async fn infer(&self, text: &str) -> Result<Prediction> {
        let mut state = self.state.lock().await;
        if state.phase != Phase::Active {
            return Err(Error::IllegalState {
                operation: "infer",
                phase: state.phase,
            });
        }
        let request = self.infer_request(text);
        let transport = state.transport.as_ref().ok_or(Error::IllegalState {
            operation: "infer",
            phase: Phase::Closed,
        })?;

        let result = transport.model_infer(request.clone()).await;
        match result {
            Ok(response) => {
                let prediction = self.decode_prediction(response.raw_output_contents)?;
                debug!(
                    sequence_id = self.sequence_id,
                    confidence = prediction.confidence,
                    "inference complete"
                );
                Ok(prediction)
            }
            Err(fault) => {
                error!(sequence_id = self.sequence_id, %fault, "inference call failed, releasing transport");
                state.transport = None;
                state.phase = Phase::Closed;
                Err(Self::wrap_fault("infer", fault, &request))
            }
        }
    }

    /// Release the transport handle.
    ///
    /// Idempotent and infallible: legal from any phase, any number of
    /// times, including after a failed `start`/`infer`/`stop`.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.transport.take().is_some() {
            debug!(sequence_id = self.sequence_id, "transport released");
        }
        state.phase = Phase::Closed;
    }

    /// Shared body of `start` and `stop`: the two control calls differ
    /// only in the command sentinel and the flag that is set.
    async fn control(&self, control: SequenceControl) -> Result<String> {
        let mut state = self.state.lock().await;
        let (operation, required, next, verb) = match control {
            SequenceControl::Start => ("start", Phase::Unstarted, Phase::Active, "started"),
            SequenceControl::Stop => ("stop", Phase::Active, Phase::Stopped, "stopped"),
        };
        if state.phase != required {
            return Err(Error::IllegalState {
                operation,
                phase: state.phase,
            });
        }
        let transport = state.transport.as_ref().ok_or(Error::IllegalState {
            operation,
            phase: Phase::Closed,
        })?;

        let request = self.control_request(&control);
        let result = transport.model_infer(request.clone()).await;
        match result {
            Ok(_) => {
                state.phase = next;
                let message = format!("sequence {} {verb}", self.sequence_id);
                info!(sequence_id = self.sequence_id, phase = %next, "sequence control call succeeded");
                Ok(message)
            }
            Err(fault) => {
                error!(sequence_id = self.sequence_id, %fault, "{operation} call failed");
                Err(Self::wrap_fault(operation, fault, &request))
            }
        }
    }

    fn control_request(&self, control: &SequenceControl) -> ModelInferRequest {
        let start = matches!(control, SequenceControl::Start);
        self.request(
            codec::text_to_bytes(control.command()),
            Vec::new(),
            start,
            !start,
        )
    }

    fn infer_request(&self, text: &str) -> ModelInferRequest {
        self.request(
            text.as_bytes().to_vec(),
            vec![
                InferRequestedOutputTensor {
                    name: self.config.output_text_name.clone(),
                    ..Default::default()
                },
                InferRequestedOutputTensor {
                    name: self.config.output_score_name.clone(),
                    ..Default::default()
                },
            ],
            false,
            false,
        )
    }

    fn request(
        &self,
        payload: Vec<u8>,
        outputs: Vec<InferRequestedOutputTensor>,
        sequence_start: bool,
        sequence_end: bool,
    ) -> ModelInferRequest {
        let mut request = ModelInferRequest {
            model_name: self.config.model_name.clone(),
            inputs: vec![InferInputTensor {
                name: self.config.input_name.clone(),
                datatype: "BYTES".to_string(),
                shape: vec![1, 1],
                contents: Some(InferTensorContents {
                    bytes_contents: vec![payload],
                    ..Default::default()
                }),
                ..Default::default()
            }],
            outputs,
            ..Default::default()
        };
        request
            .parameters
            .insert("sequence_id".to_string(), InferParameter::int64(self.sequence_id));
        request
            .parameters
            .insert("sequence_start".to_string(), InferParameter::bool(sequence_start));
        request
            .parameters
            .insert("sequence_end".to_string(), InferParameter::bool(sequence_end));
        request
    }

    /// Decode the two positional raw outputs: answer text (after the
    /// configured header skip) and the leading element of the score
    /// tensor.
    fn decode_prediction(&self, raw_outputs: Vec<Vec<u8>>) -> Result<Prediction> {
        if raw_outputs.len() < 2 {
            return Err(Error::Decode(format!(
                "expected 2 raw outputs, got {}",
                raw_outputs.len()
            )));
        }
        let skip = self.config.text_prefix_skip;
        let text_buf = &raw_outputs[0];
        if text_buf.len() < skip {
            return Err(Error::Decode(format!(
                "text output of {} bytes is shorter than its {skip}-byte header",
                text_buf.len()
            )));
        }
        let answer = std::str::from_utf8(&text_buf[skip..])
            .map_err(|e| Error::Decode(format!("answer is not valid UTF-8: {e}")))?
            .to_string();
        let scores = codec::bytes_to_f32_le(&raw_outputs[1])?;
        let confidence = *scores
            .first()
            .ok_or_else(|| Error::Decode("score tensor is empty".to_string()))?;
        Ok(Prediction { answer, confidence })
    }

    fn wrap_fault(
        operation: &'static str,
        fault: TransportFault,
        request: &ModelInferRequest,
    ) -> Error {
        match fault {
            TransportFault::Timeout(deadline) => Error::Timeout {
                operation,
                deadline,
            },
            fault => Error::Transport {
                operation,
                fault,
                request: format!("{request:?}"),
            },
        }
    }
}
