//! The prettify module turns user text into a prompt, sends it to the model
//! and hands back the model's JSON, either whole or as it streams in.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::constants::EMPTY_OBJECT;
use crate::error::UpstreamError;
use crate::limit::RateLimiter;
use crate::model::ModelClient;
use crate::template::PromptTemplate;

/// Orchestrates prompt rendering and model calls.
///
/// Holds only read-only state, so one instance serves all requests concurrently.
/// The model client is released when the last clone of the owning `Arc` is dropped.
pub struct Prettifier {
    template: PromptTemplate,
    client: Arc<dyn ModelClient>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl Prettifier {
    pub fn new(template: PromptTemplate, client: Arc<dyn ModelClient>) -> Self {
        Self {
            template,
            client,
            rate_limiter: None,
        }
    }

    /// Throttles upstream calls with `rate_limiter`.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(Arc::new(rate_limiter));
        self
    }

    /// Prettifies `input` with a single blocking model call.
    ///
    /// Blank input returns `{}` without contacting the model.
    ///
    /// # Errors
    ///
    /// Returns the upstream error if the model call fails.
    pub async fn try_prettify(&self, input: &str) -> Result<String, UpstreamError> {
        if input.trim().is_empty() {
            return Ok(EMPTY_OBJECT.to_owned());
        }

        let prompt = self.template.render(input);
        throttle(self.rate_limiter.as_deref()).await;

        debug!("Requesting complete response for {} input bytes", input.len());
        self.client.complete(&prompt).await
    }

    /// Prettifies `input`, answering `{}` when the model call fails so callers
    /// always get parseable JSON.
    pub async fn prettify(&self, input: &str) -> String {
        match self.try_prettify(input).await {
            Ok(output) => output,
            Err(err) => {
                warn!("Prettify failed ({}), answering {EMPTY_OBJECT}: {err}", err.kind());
                EMPTY_OBJECT.to_owned()
            }
        }
    }

    /// Streams the model's response to `input` chunk by chunk.
    ///
    /// Blank input gives an empty stream. Otherwise a fresh upstream stream is
    /// opened in a background task; non-empty chunks are forwarded in order and an
    /// upstream failure simply ends the stream. Dropping the returned stream
    /// cancels the upstream call.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime
    pub fn prettify_stream(&self, input: &str) -> PrettifyStream {
        let (sender, receiver) = mpsc::channel(1);

        if input.trim().is_empty() {
            return PrettifyStream { receiver };
        }

        let prompt = self.template.render(input);
        let client = Arc::clone(&self.client);
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = sender.closed() => info!("Stream cancelled by caller"),
                () = forward_chunks(client, rate_limiter, prompt, &sender) => {}
            }
        });

        PrettifyStream { receiver }
    }
}

async fn throttle(rate_limiter: Option<&RateLimiter>) {
    if let Some(limiter) = rate_limiter {
        limiter.acquire().await;
    }
}

/// Pumps upstream chunks into `sender` until upstream ends or fails.
async fn forward_chunks(
    client: Arc<dyn ModelClient>,
    rate_limiter: Option<Arc<RateLimiter>>,
    prompt: String,
    sender: &mpsc::Sender<String>,
) {
    throttle(rate_limiter.as_deref()).await;

    let mut upstream = match client.stream(&prompt).await {
        Ok(upstream) => upstream,
        Err(err) => {
            error!("Failed to open stream ({}): {err}", err.kind());
            return;
        }
    };

    let mut forwarded = 0_usize;
    while let Some(chunk) = upstream.next().await {
        match chunk {
            Ok(chunk) if chunk.is_empty() => continue,
            Ok(chunk) => {
                if sender.send(chunk).await.is_err() {
                    info!("Stream cancelled after {forwarded} chunks");
                    return;
                }
                forwarded += 1;
            }
            Err(err) => {
                error!("Stream ended by upstream failure ({}): {err}", err.kind());
                return;
            }
        }
    }

    debug!("Stream completed with {forwarded} chunks");
}

/// Chunks of a streaming prettify call, in the order the model produced them.
pub struct PrettifyStream {
    receiver: mpsc::Receiver<String>,
}

impl PrettifyStream {
    /// Waits for the next chunk; `None` once the stream is complete.
    pub async fn next_chunk(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

impl Stream for PrettifyStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
