//! Blocking `ureq` agent adapted to the callback `Transport` interface.
//!
//! Every exchange runs on its own worker thread and reports through its
//! `Completer` from that thread. Non-2xx statuses are returned as responses,
//! never as transport errors, so status classification stays in the bridge.

use std::fmt;
use std::io;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::bridge::{Completer, Transport};
use crate::error::TransportFault;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thread-per-request transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn enqueue(&self, request: HttpRequest, completer: Completer) {
        let agent = self.agent.clone();
        let fallback = completer.clone();
        let spawned = thread::Builder::new()
            .name("flipping-api-http".to_string())
            .spawn(move || match execute(&agent, &request) {
                Ok(response) => completer.on_response(response),
                Err(fault) => completer.on_failure(fault),
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not start http worker");
            fallback.on_failure(TransportFault::Io(err));
        }
    }
}

fn execute(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportFault> {
    let result = match request.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            match &request.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(transport_fault)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    // The status line has arrived; a body failure from here on belongs to
    // the response, not the exchange.
    let body = match response.body_mut().read_to_vec() {
        Ok(bytes) => ResponseBody::from(bytes),
        Err(err) => ResponseBody::failed(io::Error::other(err)),
    };

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn transport_fault(err: ureq::Error) -> TransportFault {
    match err {
        ureq::Error::Io(err) => TransportFault::Io(err),
        other => TransportFault::Http(other.to_string()),
    }
}
