use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use inspector_governor::auth::{
    BearerTokenProvider, CredentialProvider, HttpTokenIssuer, ManualClock, RefreshSettings,
    TokenIssuer,
};
use inspector_governor::error::{AuthError, IsRetryable, OauthError, RetryError};
use inspector_governor::retry::{DelayPolicy, RetryPolicy};
use serde_json::json;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone)]
struct Captured {
    headers: HeaderMap,
    form: HashMap<String, String>,
}

/// Token endpoint replaying scripted responses; `200` once the script runs out.
#[derive(Clone, Default)]
struct IssuerState {
    reqs: Arc<Mutex<Vec<Captured>>>,
    script: Arc<Mutex<VecDeque<Response>>>,
}

impl IssuerState {
    fn push(&self, resp: Response) {
        self.script.lock().unwrap().push_back(resp);
    }

    fn requests(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

async fn token_handler(
    State(state): State<IssuerState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();
    state.reqs.lock().unwrap().push(Captured { headers, form });

    let scripted = state.script.lock().unwrap().pop_front();
    scripted.unwrap_or_else(|| {
        let n = state.reqs.lock().unwrap().len();
        (
            StatusCode::OK,
            Json(json!({
                "access_token": format!("tok-{n}"),
                "token_type": "bearer",
                "expires_in": 1799
            })),
        )
            .into_response()
    })
}

async fn spawn_issuer() -> (IssuerState, HttpTokenIssuer) {
    let state = IssuerState::default();
    let app = Router::new()
        .route("/csp/gateway/am/api/auth/api-tokens/authorize", post(token_handler))
        .with_state(state.clone());
    let base = spawn_test_server(app).await;
    let token_url = base
        .join("/csp/gateway/am/api/auth/api-tokens/authorize")
        .expect("token url");
    (state, HttpTokenIssuer::new(reqwest::Client::new(), token_url))
}

fn fast_settings() -> RefreshSettings {
    RefreshSettings {
        max_age: Duration::from_secs(600),
        policy: RetryPolicy::new(
            "auth token refresh",
            3,
            DelayPolicy::fixed(Duration::from_millis(10)),
        ),
    }
}

#[tokio::test]
async fn issue_posts_api_token_as_form_field() {
    let (state, issuer) = spawn_issuer().await;

    let issued = issuer.issue("my-api-token").await.expect("issue");
    assert_eq!(issued.access_token, "tok-1");
    assert_eq!(issued.expires_in, 1799);

    let reqs = state.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(
        reqs[0].form.get("refresh_token").map(String::as_str),
        Some("my-api-token")
    );
    let content_type = reqs[0]
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("application/x-www-form-urlencoded"));
}

#[tokio::test]
async fn throttling_surfaces_retry_after() {
    let (state, issuer) = spawn_issuer().await;
    state.push(
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "7")],
            "slow down",
        )
            .into_response(),
    );

    let err = issuer.issue("my-api-token").await.unwrap_err();
    assert!(matches!(
        err,
        OauthError::UpstreamStatus { status, .. }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
    ));
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn rejected_api_token_is_not_retryable() {
    let (state, issuer) = spawn_issuer().await;
    state.push(
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "invalid_grant"})),
        )
            .into_response(),
    );

    let err = issuer.issue("revoked").await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn malformed_body_is_a_retryable_parse_error() {
    let (state, issuer) = spawn_issuer().await;
    state.push((StatusCode::OK, "<html>maintenance</html>").into_response());

    let err = issuer.issue("my-api-token").await.unwrap_err();
    match &err {
        OauthError::Parse { body, .. } => assert!(body.contains("maintenance")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_access_token_is_rejected() {
    let (state, issuer) = spawn_issuer().await;
    state.push(
        (
            StatusCode::OK,
            Json(json!({"access_token": "", "expires_in": 60})),
        )
            .into_response(),
    );

    let err = issuer.issue("my-api-token").await.unwrap_err();
    assert!(matches!(err, OauthError::MissingAccessToken));
}

#[tokio::test]
async fn provider_retries_transient_issuer_failures() {
    let (state, issuer) = spawn_issuer().await;
    state.push(StatusCode::SERVICE_UNAVAILABLE.into_response());
    state.push(StatusCode::BAD_GATEWAY.into_response());

    let provider = CredentialProvider::new(
        "my-api-token",
        Arc::new(issuer),
        Arc::new(ManualClock::default()),
        fast_settings(),
    );

    let token = provider
        .bearer_token(&CancellationToken::new())
        .await
        .expect("token after retries");
    assert_eq!(token, "tok-3");
    assert_eq!(state.requests().len(), 3);
}

#[tokio::test]
async fn provider_gives_up_after_max_attempts() {
    let (state, issuer) = spawn_issuer().await;
    for _ in 0..3 {
        state.push(StatusCode::SERVICE_UNAVAILABLE.into_response());
    }

    let provider = CredentialProvider::new(
        "my-api-token",
        Arc::new(issuer),
        Arc::new(ManualClock::default()),
        fast_settings(),
    );

    let err = provider
        .bearer_token(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Refresh(RetryError::Exhausted { max_attempts: 3, .. })
    ));
    assert_eq!(state.requests().len(), 3);
}
