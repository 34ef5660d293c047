//! Authenticated async client for the trade-tracking API.
//!
//! # Overview
//! Builds `HttpRequest` values for every endpoint, hands them to a
//! callback-driven `Transport`, and exposes each exchange as a future that
//! resolves to the decoded payload or a `ClassifiedError`.
//!
//! # Design
//! - `FlippingClient` is stateless: it holds the configuration and a shared
//!   transport, and takes the bearer token as an argument on every call.
//! - Each endpoint is split into `build_*` (pure, produces a request) and an
//!   operation method (dispatches it), so the I/O boundary is explicit.
//! - Every response body is the same `Envelope<T>`; decoding is generic over
//!   the payload type.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod bridge;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use bridge::{dispatch, Completer, ResponseFuture, Transport};
pub use client::FlippingClient;
pub use config::ApiConfig;
pub use envelope::{decode_envelope, ApiError, ApiMessage, Envelope};
pub use error::{BuildError, ClassifiedError, DecodeFault, TransportFault};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody, ResponseMeta};
pub use transport::UreqTransport;
pub use types::{Account, LoginRequest, OfferState, SlotState, SlotsUpdate, TokenResponse};
