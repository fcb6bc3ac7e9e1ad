//! Bounded fan-out over a batch of independent lines.
//!
//! One failed line never aborts the batch: every non-blank input yields a
//! [`LineResult`] whose outcome is inspected (or logged) per item.

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::client::{Prediction, QuestionAnswerClient};
use crate::error::Result;

/// Outcome for a single line of a batch.
#[derive(Debug)]
pub struct LineResult {
    pub line: String,
    pub outcome: Result<Prediction>,
}

/// Run `infer` over every non-blank line, at most `concurrency` in
/// flight at once, preserving input order in the returned results.
///
/// The client serializes its calls internally, so `concurrency` bounds
/// how many lines are queued rather than how many travel in parallel;
/// failures are isolated per line either way.
pub async fn process_lines<I>(
    client: &QuestionAnswerClient,
    lines: I,
    concurrency: usize,
) -> Vec<LineResult>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let lines: Vec<String> = lines
        .into_iter()
        .map(Into::into)
        .filter(|line| !line.trim().is_empty())
        .collect();

    stream::iter(lines)
        .map(|line| async move {
            let outcome = client.infer(&line).await;
            if let Err(e) = &outcome {
                warn!(line = %line, error = %e, "line inference failed");
            }
            LineResult { line, outcome }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::codec;
    use crate::proto::{ModelInferRequest, ModelInferResponse};
    use crate::transport::{InferenceTransport, TransportFault};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct ScriptedTransport {
        replies: StdMutex<VecDeque<std::result::Result<ModelInferResponse, TransportFault>>>,
    }

    #[async_trait]
    impl InferenceTransport for ScriptedTransport {
        async fn model_infer(
            &self,
            _request: ModelInferRequest,
        ) -> std::result::Result<ModelInferResponse, TransportFault> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ModelInferResponse::default()))
        }
    }

    fn answer_response(answer: &str, confidence: f32) -> ModelInferResponse {
        let mut text = vec![0u8; 4];
        text.extend_from_slice(answer.as_bytes());
        ModelInferResponse {
            raw_output_contents: vec![text, codec::f32_to_bytes_le(&[confidence])],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_one_bad_line_does_not_abort_the_batch() {
        // start, then per-line replies; the middle line's response is
        // malformed (single output), which is a local decode error and
        // leaves the session usable.
        let transport = ScriptedTransport {
            replies: StdMutex::new(VecDeque::from(vec![
                Ok(ModelInferResponse::default()),
                Ok(answer_response("first", 0.9)),
                Ok(ModelInferResponse {
                    raw_output_contents: vec![vec![0u8; 8]],
                    ..Default::default()
                }),
                Ok(answer_response("third", 0.4)),
            ])),
        };
        let client = crate::client::QuestionAnswerClient::with_transport(
            ClientConfig::default(),
            7,
            Box::new(transport),
        );
        client.start().await.unwrap();

        let results = process_lines(&client, ["uno", "   ", "dos", "tres"], 2).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].line, "uno");
        assert_eq!(results[0].outcome.as_ref().unwrap().answer, "first");
        assert!(results[1].outcome.is_err());
        assert_eq!(results[2].outcome.as_ref().unwrap().answer, "third");

        client.stop().await.unwrap();
    }
}
