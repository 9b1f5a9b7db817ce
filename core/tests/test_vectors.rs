//! Drive `MockSession` from JSON test vectors stored in `test-vectors/`.
//!
//! Each case lists the replies to queue, the requests to send, and the
//! outcome each request must produce. Requests are also checked against the
//! mock's request log.

use session_core::{HttpMethod, HttpRequest, HttpResponse, MockReply, MockSession, Session, SessionError};

fn parse_headers(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|headers| {
            headers
                .iter()
                .map(|h| {
                    let arr = h.as_array().unwrap();
                    (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_error(value: &serde_json::Value) -> SessionError {
    let message = value["message"].as_str().unwrap_or_default().to_string();
    match value["error"].as_str().unwrap() {
        "Cancelled" => SessionError::Cancelled,
        "Timeout" => SessionError::Timeout,
        "InvalidUrl" => SessionError::InvalidUrl(message),
        "ConnectionFailed" => SessionError::ConnectionFailed(message),
        "Transport" => SessionError::Transport(message),
        other => panic!("unknown error kind: {other}"),
    }
}

fn parse_reply(value: &serde_json::Value) -> MockReply {
    if value.get("error").is_some() {
        return MockReply::failure(parse_error(value));
    }
    let mut response = HttpResponse::new(value["status"].as_u64().unwrap() as u16, "");
    response.headers = parse_headers(&value["headers"]);
    MockReply::Data {
        body: value["body"].as_str().unwrap().as_bytes().to_vec(),
        response,
    }
}

fn parse_request(value: &serde_json::Value) -> HttpRequest {
    let method: HttpMethod = value["method"].as_str().unwrap().parse().unwrap();
    let request = HttpRequest::new(method, value["url"].as_str().unwrap());
    match value["body"].as_str() {
        Some(body) => request.with_body(body),
        None => request,
    }
}

#[test]
fn mock_session_test_vectors() {
    let raw = include_str!("../../test-vectors/mock_session.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let session = MockSession::new();
        for reply in case["replies"].as_array().unwrap() {
            session.push_reply(parse_reply(reply));
        }

        let requests: Vec<HttpRequest> = case["requests"].as_array().unwrap().iter().map(parse_request).collect();
        let expected = case["expected"].as_array().unwrap();
        assert_eq!(requests.len(), expected.len(), "{name}: malformed vector");

        for (request, expected) in requests.iter().zip(expected) {
            let outcome = session.data(request);
            if expected.get("error").is_some() {
                assert_eq!(outcome, Err(parse_error(expected)), "{name}: error");
                continue;
            }
            let (data, response) = outcome.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            assert_eq!(data, expected["body"].as_str().unwrap().as_bytes(), "{name}: body");
            assert_eq!(response.status as u64, expected["status"].as_u64().unwrap(), "{name}: status");
            assert_eq!(response.url, request.url, "{name}: url");
            assert_eq!(response.headers, parse_headers(&expected["headers"]), "{name}: headers");
        }

        assert_eq!(session.requests(), requests, "{name}: request log");
        assert_eq!(session.pending(), 0, "{name}: unconsumed replies");
    }
}
