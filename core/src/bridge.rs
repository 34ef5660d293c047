//! Turns one callback-driven transport exchange into one future.
//!
//! # Design
//! `dispatch` pairs every request with a tokio oneshot channel. The sending
//! half lives inside a `Completer`, a cloneable single-assignment cell handed
//! to the transport: whichever terminal callback reaches it first takes the
//! resolver out of the cell, classifies the outcome on the calling thread and
//! sends the result. Later callbacks find the cell empty and are dropped, so
//! the future resolves exactly once no matter how the transport behaves.
//!
//! Dropping the `ResponseFuture` does not cancel the exchange; the result is
//! discarded when the transport eventually completes. Dropping every
//! `Completer` without completing resolves the future with
//! `TransportFault::Abandoned`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::envelope::decode_envelope;
use crate::error::{ClassifiedError, TransportFault};
use crate::http::{HttpRequest, HttpResponse};

/// A callback-driven HTTP transport.
///
/// `enqueue` must not block on the exchange. The transport reports the
/// terminal event of the exchange through `completer`, from any thread.
pub trait Transport: Send + Sync {
    fn enqueue(&self, request: HttpRequest, completer: Completer);
}

type Resolver = Box<dyn FnOnce(Result<HttpResponse, TransportFault>) + Send>;

/// Terminal-event handle for one exchange. The first call to
/// `on_response` or `on_failure` across all clones wins.
#[derive(Clone)]
pub struct Completer {
    slot: Arc<Mutex<Option<Resolver>>>,
}

impl Completer {
    fn new(resolver: impl FnOnce(Result<HttpResponse, TransportFault>) + Send + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(resolver)))),
        }
    }

    /// A response (of any status) was received.
    pub fn on_response(&self, response: HttpResponse) {
        self.complete(Ok(response));
    }

    /// The exchange ended without a response.
    pub fn on_failure(&self, fault: TransportFault) {
        self.complete(Err(fault));
    }

    pub fn is_completed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    fn complete(&self, outcome: Result<HttpResponse, TransportFault>) {
        let resolver = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match resolver {
            Some(resolve) => resolve(outcome),
            None => debug!(
                late_failure = outcome.is_err(),
                "ignoring completion for an exchange that already resolved"
            ),
        }
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Resolves to the decoded payload of one exchange, or its classified error.
#[must_use = "the exchange runs regardless, but its result is lost if the future is dropped"]
pub struct ResponseFuture<T> {
    request: HttpRequest,
    receiver: oneshot::Receiver<Result<T, ClassifiedError>>,
}

impl<T> ResponseFuture<T> {
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

impl<T> Unpin for ResponseFuture<T> {}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T, ClassifiedError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => {
                warn!(request = %this.request, "transport released exchange without completing it");
                Poll::Ready(Err(ClassifiedError::TransportFailure {
                    request: this.request.clone(),
                    fault: TransportFault::Abandoned,
                }))
            }
        }
    }
}

impl<T> fmt::Debug for ResponseFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Start `request` on `transport` and return a future for its `Envelope<T>`
/// payload.
pub fn dispatch<T>(transport: &dyn Transport, request: HttpRequest) -> ResponseFuture<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let pending = request.clone();
    let completer = Completer::new(move |outcome| {
        let result = classify::<T>(pending, outcome);
        if sender.send(result).is_err() {
            debug!("response future dropped before its exchange completed");
        }
    });

    debug!(method = %request.method, url = %request.url, "enqueueing request");
    transport.enqueue(request.clone(), completer);

    ResponseFuture { request, receiver }
}

fn classify<T: DeserializeOwned>(
    request: HttpRequest,
    outcome: Result<HttpResponse, TransportFault>,
) -> Result<T, ClassifiedError> {
    let response = match outcome {
        Ok(response) => response,
        Err(fault) => {
            warn!(%request, error = %fault, "request failed without a response");
            return Err(ClassifiedError::TransportFailure { request, fault });
        }
    };

    if !response.is_success() {
        let (meta, body) = response.into_parts();
        match body.read_to_string() {
            Ok(text) => info!(%request, status = meta.status, body = %text, "response not successful"),
            Err(err) => info!(
                %request,
                status = meta.status,
                error = %err,
                "couldn't read body of unsuccessful response"
            ),
        }
        return Err(ClassifiedError::StatusFailure {
            request,
            response: meta,
        });
    }

    decode_envelope(request, response)
}
