//! Rate-limit classification across the three detection tiers.

use dunning::providers::{ApiErrorDetail, FailureKind, ProviderError};

fn http(status: u16, detail: Option<ApiErrorDetail>, body: &str) -> ProviderError {
    ProviderError::HttpStatus {
        status,
        detail,
        body: body.to_owned(),
    }
}

#[test]
fn http_429_is_rate_limited() {
    let err = http(429, None, "");
    assert_eq!(err.failure_kind(), FailureKind::RateLimited);
    assert!(err.is_rate_limited());
}

#[test]
fn structured_code_429_is_rate_limited() {
    let detail = ApiErrorDetail {
        code: Some(429),
        status: None,
        message: None,
    };
    assert_eq!(
        http(400, Some(detail), "").failure_kind(),
        FailureKind::RateLimited
    );
}

#[test]
fn structured_resource_exhausted_is_rate_limited() {
    let detail = ApiErrorDetail {
        code: Some(403),
        status: Some("RESOURCE_EXHAUSTED".to_owned()),
        message: None,
    };
    assert_eq!(
        http(403, Some(detail), "").failure_kind(),
        FailureKind::RateLimited
    );
}

#[test]
fn text_markers_in_error_body_are_rate_limited() {
    for text in [
        "upstream said 429",
        "RESOURCE_EXHAUSTED",
        "quota exceeded for project",
        "Too Many Requests",
    ] {
        assert_eq!(
            http(503, None, text).failure_kind(),
            FailureKind::RateLimited,
            "{text}"
        );
    }
}

#[test]
fn marker_in_detail_message_is_rate_limited() {
    let detail = ApiErrorDetail {
        code: Some(403),
        status: Some("PERMISSION_DENIED".to_owned()),
        message: Some("Quota exceeded for quota metric 'generate_content_requests'".to_owned()),
    };
    assert_eq!(
        http(403, Some(detail), "[body elided]").failure_kind(),
        FailureKind::RateLimited
    );
}

#[test]
fn marker_in_error_body_is_rate_limited() {
    let err = http(503, None, "You exceeded your current quota");
    assert_eq!(err.failure_kind(), FailureKind::RateLimited);
}

#[test]
fn auth_failure_is_other() {
    let detail = ApiErrorDetail {
        code: Some(401),
        status: Some("UNAUTHENTICATED".to_owned()),
        message: Some("API key not valid".to_owned()),
    };
    assert_eq!(
        http(401, Some(detail), "API key not valid").failure_kind(),
        FailureKind::Other
    );
}

#[test]
fn parse_error_is_other() {
    let err = ProviderError::Parse("expected value at line 1 column 1".to_owned());
    assert_eq!(err.failure_kind(), FailureKind::Other);
}

#[test]
fn parse_position_containing_429_is_other() {
    for position in ["column 429", "column 1429", "column 4290", "line 429 column 7"] {
        let err = ProviderError::Parse(format!("EOF while parsing a string at line 1 {position}"));
        assert_eq!(err.failure_kind(), FailureKind::Other, "{position}");
    }
}

#[test]
fn unavailable_generator_is_other_even_with_marker_text() {
    let err = ProviderError::Unavailable("quota of configured models is 0".to_owned());
    assert_eq!(err.failure_kind(), FailureKind::Other);
}

#[test]
fn markers_are_case_sensitive() {
    let err = http(503, None, "Quota page unavailable");
    assert_eq!(err.failure_kind(), FailureKind::Other);
}

#[test]
fn detail_parses_google_error_envelope() {
    let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
    let detail = ApiErrorDetail::from_body(body).expect("envelope should parse");
    assert_eq!(detail.code, Some(429));
    assert_eq!(detail.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
    assert_eq!(detail.message.as_deref(), Some("Resource has been exhausted"));
}

#[test]
fn detail_is_none_for_plain_text_body() {
    assert!(ApiErrorDetail::from_body("Service Unavailable").is_none());
}
