//! Completion-bridge behavior against scripted in-memory transports.
//!
//! Each transport here stands in for a callback-driven HTTP library and
//! misbehaves in one specific way: completing twice, completing from another
//! thread, dropping the exchange, or losing the body stream.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flipping_api::{
    dispatch, Account, ApiConfig, ClassifiedError, Completer, DecodeFault, FlippingClient,
    HttpMethod, HttpRequest, HttpResponse, ResponseBody, Transport, TransportFault,
};

/// Transport driven by a closure that receives each exchange.
struct Scripted<F>(F);

impl<F> Transport for Scripted<F>
where
    F: Fn(HttpRequest, Completer) + Send + Sync,
{
    fn enqueue(&self, request: HttpRequest, completer: Completer) {
        (self.0)(request, completer)
    }
}

fn client<F>(script: F) -> FlippingClient
where
    F: Fn(HttpRequest, Completer) + Send + Sync + 'static,
{
    FlippingClient::new(
        ApiConfig::new("http://api.test/v1"),
        Arc::new(Scripted(script)),
    )
}

fn request() -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        url: "http://api.test/v1/ge/slots/update".to_string(),
        headers: Vec::new(),
        body: None,
    }
}

fn envelope(data: &str) -> String {
    format!(r#"{{"data":{data},"errors":[],"messages":[],"time":"2024-01-01T00:00:00Z"}}"#)
}

#[tokio::test]
async fn first_completion_wins_over_later_failure() {
    let transport = Scripted(|_req: HttpRequest, completer: Completer| {
        completer.on_response(HttpResponse::new(200, envelope("4")));
        completer.on_failure(TransportFault::Http("late error".to_string()));
    });
    let ignored: i64 = dispatch(&transport, request()).await.unwrap();
    assert_eq!(ignored, 4);
}

#[tokio::test]
async fn first_failure_wins_over_later_response() {
    let transport = Scripted(|_req: HttpRequest, completer: Completer| {
        let other = completer.clone();
        completer.on_failure(TransportFault::Http("connection reset".to_string()));
        other.on_response(HttpResponse::new(200, envelope("4")));
    });
    let err = dispatch::<i64>(&transport, request()).await.unwrap_err();
    assert!(matches!(
        err,
        ClassifiedError::TransportFailure {
            fault: TransportFault::Http(_),
            ..
        }
    ));
}

#[tokio::test]
async fn double_fire_from_worker_threads_resolves_once() {
    let transport = Scripted(|_req: HttpRequest, completer: Completer| {
        let second = completer.clone();
        thread::spawn(move || completer.on_response(HttpResponse::new(200, envelope("1"))));
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            second.on_response(HttpResponse::new(200, envelope("2")));
        });
    });
    let value: i64 = dispatch(&transport, request()).await.unwrap();
    assert_eq!(value, 1);
}

#[tokio::test]
async fn dropped_exchange_is_transport_failure() {
    let transport = Scripted(|_req: HttpRequest, completer: Completer| {
        thread::spawn(move || drop(completer));
    });
    let err = dispatch::<i64>(&transport, request()).await.unwrap_err();
    match err {
        ClassifiedError::TransportFailure { request, fault } => {
            assert!(matches!(fault, TransportFault::Abandoned));
            assert_eq!(request.url, "http://api.test/v1/ge/slots/update");
        }
        other => panic!("expected TransportFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_refused_is_transport_failure() {
    let c = client(|_req, completer| {
        completer.on_failure(TransportFault::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        )));
    });
    let err = c.fetch_accounts("tok").await.unwrap_err();
    assert!(matches!(err, ClassifiedError::TransportFailure { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn bad_status_with_unreadable_body_is_status_failure() {
    let c = client(|_req, completer| {
        let body = ResponseBody::failed(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        completer.on_response(HttpResponse::new(502, body));
    });
    let err = c.fetch_accounts("tok").await.unwrap_err();
    assert!(matches!(err, ClassifiedError::StatusFailure { ref response, .. } if response.status == 502));
}

#[tokio::test]
async fn expired_token_refresh_is_status_failure_not_decode_failure() {
    let c = client(|_req, completer| {
        completer.on_response(HttpResponse::new(401, envelope(r#"{"access_token":"still-here"}"#)));
    });
    let err = c.refresh_token("expired").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, ClassifiedError::StatusFailure { .. }));
}

#[tokio::test]
async fn register_resolves_account() {
    let c = client(|req, completer| {
        assert_eq!(req.header("authorization"), Some("bearer tok"));
        assert!(req.url.ends_with("account/register?rsn=zezima"));
        completer.on_response(HttpResponse::new(
            200,
            r#"{"data":{"name":"zezima","id":7},"errors":[],"time":"2024-01-01T00:00:00Z"}"#,
        ));
    });
    let account = c.register_account("tok", "zezima").await.unwrap();
    assert_eq!(
        account,
        Account {
            id: 7,
            name: "zezima".to_string()
        }
    );
}

#[tokio::test]
async fn null_data_is_empty_payload_failure() {
    let c = client(|_req, completer| completer.on_response(HttpResponse::new(200, envelope("null"))));
    let err = c.fetch_accounts("tok").await.unwrap_err();
    assert!(matches!(err, ClassifiedError::EmptyPayloadFailure { .. }));
}

#[tokio::test]
async fn application_errors_are_surfaced() {
    let c = client(|_req, completer| {
        completer.on_response(HttpResponse::new(
            200,
            r#"{"data":null,"errors":[{"code":400,"type":"VALIDATION","key":"rsn","message":"rsn must not be empty"}],"time":"t"}"#,
        ));
    });
    let err = c.register_account("tok", "").await.unwrap_err();
    assert_eq!(err.api_errors().len(), 1);
    assert_eq!(err.api_errors()[0].key, "rsn");
}

#[tokio::test]
async fn malformed_body_is_decode_failure() {
    let c = client(|_req, completer| completer.on_response(HttpResponse::new(200, "{\"data\":")));
    let err = c.fetch_accounts("tok").await.unwrap_err();
    assert!(matches!(
        err,
        ClassifiedError::DecodeFailure {
            fault: DecodeFault::Parse(_),
            ..
        }
    ));
}

#[tokio::test]
async fn login_exchange_maps_access_token() {
    let c = client(|req, completer| {
        assert_eq!(req.header("authorization"), None);
        assert_eq!(req.body.as_deref(), Some(r#"{"token":"login-1"}"#));
        completer.on_response(HttpResponse::new(200, envelope(r#"{"access_token":"jwt-1"}"#)));
    });
    let token = c.exchange_login_token("login-1").unwrap().await.unwrap();
    assert_eq!(token, "jwt-1");
}

#[tokio::test]
async fn concurrent_calls_do_not_cross_talk() {
    // Echo the rsn back, completing in reverse order of submission.
    let c = client(|req, completer| {
        let rsn = req.url.rsplit("rsn=").next().unwrap_or_default().to_string();
        let index: u64 = rsn.trim_start_matches("user").parse().unwrap_or(0);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(40 - index));
            if index % 5 == 0 {
                completer.on_response(HttpResponse::new(500, "boom"));
            } else {
                let body = format!(r#"{{"data":{{"id":{index},"name":"{rsn}"}},"errors":[]}}"#);
                completer.on_response(HttpResponse::new(200, body));
            }
        });
    });

    let futures: Vec<_> = (0..32)
        .map(|i| c.register_account("tok", &format!("user{i}")))
        .collect();
    let results = futures::future::join_all(futures).await;

    for (i, result) in results.into_iter().enumerate() {
        if i % 5 == 0 {
            let err = result.unwrap_err();
            assert!(err.request().url.ends_with(&format!("rsn=user{i}")));
            assert_eq!(err.status(), Some(500));
        } else {
            let account = result.unwrap();
            assert_eq!(account.id, i as i64);
            assert_eq!(account.name, format!("user{i}"));
        }
    }
}

#[tokio::test]
async fn dropped_future_does_not_stop_the_exchange() {
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let c = client(move |_req, completer| {
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.on_response(HttpResponse::new(200, envelope("[]")));
            done_tx.send(completer.is_completed()).unwrap();
        });
    });

    drop(c.fetch_accounts("tok"));
    let completed = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(completed);
}
