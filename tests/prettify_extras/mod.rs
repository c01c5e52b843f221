#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use prettify_relay::{ChunkStream, ModelClient, Prettifier, PromptTemplate, UpstreamError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// How the stub answers.
#[derive(Clone)]
pub(crate) enum Reply {
    /// Returns the rendered prompt, so tests can see what reached the model.
    EchoPrompt,
    Text(String),
    Chunks(Vec<String>),
    /// Yields the chunks, then fails.
    ChunksThenFail(Vec<String>),
    /// Yields the chunks, then never ends.
    ChunksThenHang(Vec<String>),
    /// Never answers.
    Hang,
    AuthFailure,
    Panic,
}

/// Sets the flag when the upstream call or stream is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct StubModelClient {
    reply: Reply,
    calls: AtomicUsize,
    upstream_dropped: Arc<AtomicBool>,
}

impl StubModelClient {
    pub fn new(reply: Reply) -> Self {
        StubModelClient {
            reply,
            calls: AtomicUsize::new(0),
            upstream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upstream_dropped(&self) -> bool {
        self.upstream_dropped.load(Ordering::SeqCst)
    }

    fn auth_error() -> UpstreamError {
        UpstreamError::Auth("invalid API key".to_owned())
    }
}

#[async_trait]
impl ModelClient for StubModelClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::EchoPrompt => Ok(prompt.to_owned()),
            Reply::Text(text) => Ok(text.clone()),
            Reply::Chunks(chunks)
            | Reply::ChunksThenFail(chunks)
            | Reply::ChunksThenHang(chunks) => Ok(chunks.concat()),
            Reply::Hang => {
                let _flag = DropFlag(Arc::clone(&self.upstream_dropped));
                futures::future::pending().await
            }
            Reply::AuthFailure => Err(Self::auth_error()),
            Reply::Panic => panic!("model exploded"),
        }
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let flag = DropFlag(Arc::clone(&self.upstream_dropped));

        let (chunks, tail): (Vec<String>, ChunkStream) = match &self.reply {
            Reply::EchoPrompt => (vec![prompt.to_owned()], ends()),
            Reply::Text(text) => (vec![text.clone()], ends()),
            Reply::Chunks(chunks) => (chunks.clone(), ends()),
            Reply::ChunksThenFail(chunks) => (chunks.clone(), fails()),
            Reply::ChunksThenHang(chunks) => (chunks.clone(), hangs()),
            Reply::Hang => (Vec::new(), hangs()),
            Reply::AuthFailure => return Err(Self::auth_error()),
            Reply::Panic => panic!("model exploded"),
        };

        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<String, UpstreamError>))
            .chain(tail)
            .map(move |chunk| {
                let _ = &flag;
                chunk
            });

        Ok(Box::pin(stream))
    }
}

fn ends() -> ChunkStream {
    Box::pin(futures::stream::empty())
}

fn fails() -> ChunkStream {
    Box::pin(futures::stream::once(async {
        Err(UpstreamError::Network("connection reset".to_owned()))
    }))
}

fn hangs() -> ChunkStream {
    Box::pin(futures::stream::pending())
}

pub(crate) const TEST_TEMPLATE: &str = "Prettify this: {input}";

pub(crate) fn prettifier(client: Arc<StubModelClient>) -> Prettifier {
    Prettifier::new(PromptTemplate::new(TEST_TEMPLATE), client)
}

/// Runs the HTTP server on an ephemeral port.
///
/// Returns the base URL and a sender that stops the server.
pub(crate) async fn spawn_server(client: Arc<StubModelClient>) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener.");
    let address = listener
        .local_addr()
        .expect("Listener has no local address.");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(prettify_relay::server::serve(
        listener,
        prettifier(client),
        async move {
            let _ = stop_rx.await;
        },
    ));

    (format!("http://{address}"), stop_tx)
}
