//! tagger_client: sequence-stateful inference client for Triton-style
//! gRPC model servers.
//!
//! The remote model keeps per-sequence conversational state, but the RPC
//! surface is a single stateless unary call. This crate bridges the two:
//! every request carries a sequence id and start/end flags, the client
//! enforces the start → infer* → stop → close lifecycle locally, and the
//! packed binary output tensors are decoded into typed values.
//!
//! # Example
//!
//! ```no_run
//! use tagger_client::{generate_sequence_id, process_lines, ClientConfig, QuestionAnswerClient};
//!
//! #[tokio::main]
//! async fn main() -> tagger_client::Result<()> {
//!     let config = ClientConfig::new("localhost", 9001, "sentence_tagger");
//!     let client = QuestionAnswerClient::connect(config, generate_sequence_id()).await?;
//!
//!     println!("{}", client.start().await?);
//!     for result in process_lines(&client, ["Hola", "¿Cómo estás?"], 4).await {
//!         match result.outcome {
//!             Ok(p) => println!("{}: {} ({:.2})", result.line, p.answer, p.confidence),
//!             Err(e) => eprintln!("{}: {e}", result.line),
//!         }
//!     }
//!     println!("{}", client.stop().await?);
//!     client.close().await;
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;

// Wire format and transport
pub mod proto;
pub mod transport;

// Core functionality
pub mod batch;
pub mod client;
pub mod codec;
pub mod sequence_id;

// Re-export commonly used types and functions
pub use error::{Error, Result};

pub use batch::{process_lines, LineResult};
pub use client::{ClientConfig, Phase, Prediction, QuestionAnswerClient};
pub use codec::{bytes_to_f32_le, bytes_to_i32_le, f32_to_bytes_le, i32_to_bytes_le, text_to_bytes};
pub use sequence_id::generate_sequence_id;
pub use transport::{GrpcTransport, InferenceTransport, TransportFault};
