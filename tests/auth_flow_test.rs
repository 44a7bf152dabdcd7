mod common;

use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    sync::Arc,
    time::Duration,
};

use common::FakeExchange;
use reqwest::StatusCode;
use setlist::{
    error::{AuthError, CancelReason},
    spotify::auth::{AuthPhase, AuthSession, AuthSettings, AuthorizationFlow, TlsSource},
};
use tokio::{sync::oneshot, task::JoinHandle};
use url::Url;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn flow(redirect_url: &str, exchange: Arc<FakeExchange>) -> AuthorizationFlow {
    AuthorizationFlow::new(
        AuthSettings {
            client_id: "client".to_string(),
            authorize_url: "https://accounts.example.test/authorize".to_string(),
            redirect_url: redirect_url.to_string(),
            scope: "playlist-modify-private".to_string(),
            tls: TlsSource::SelfSigned,
        },
        exchange,
    )
    .with_shutdown_grace(Duration::from_millis(200))
}

async fn never_cancel() -> CancelReason {
    tokio::time::sleep(Duration::from_secs(30)).await;
    CancelReason::TimedOut
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

/// Waits for the authorization URL, then calls the redirect URL with the
/// query built by `query` from the attempt's state.
fn browser<F>(
    url_rx: oneshot::Receiver<String>,
    redirect_url: String,
    query: F,
) -> JoinHandle<(StatusCode, String)>
where
    F: FnOnce(&str) -> String + Send + 'static,
{
    tokio::spawn(async move {
        let auth_url = Url::parse(&url_rx.await.unwrap()).unwrap();
        let state = auth_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        let response = http_client()
            .get(format!("{}?{}", redirect_url, query(&state)))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    })
}

#[tokio::test]
async fn callback_with_matching_state_yields_token() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);
    let exchange = Arc::new(FakeExchange::ok());
    let (url_tx, url_rx) = oneshot::channel();

    let browser = browser(url_rx, redirect.clone(), |state| {
        format!("code=abc&state={}", state)
    });
    let token = flow(&redirect, Arc::clone(&exchange))
        .authorize(
            move |url| {
                let _ = url_tx.send(url.to_string());
            },
            never_cancel(),
        )
        .await
        .unwrap();

    assert_eq!(token.access_token, "access-for-abc");
    let (status, body) = browser.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Authentication successful"));

    let codes = exchange.codes.lock().unwrap().clone();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].0, "abc");
    assert_eq!(codes[0].1.len(), 128);
}

#[tokio::test]
async fn listener_accepts_before_url_is_shown() {
    let port = free_port();
    let redirect = format!("http://localhost:{}/callback", port);
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize(
            move |_| assert!(TcpStream::connect(addr).is_ok()),
            async { CancelReason::Aborted },
        )
        .await;

    assert!(matches!(
        result,
        Err(AuthError::Cancelled(CancelReason::Aborted))
    ));
}

#[tokio::test]
async fn state_mismatch_fails_without_exchange() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);
    let exchange = Arc::new(FakeExchange::ok());
    let (url_tx, url_rx) = oneshot::channel();

    let browser = browser(url_rx, redirect.clone(), |_| {
        "code=abc&state=forged".to_string()
    });
    let result = flow(&redirect, Arc::clone(&exchange))
        .authorize(
            move |url| {
                let _ = url_tx.send(url.to_string());
            },
            never_cancel(),
        )
        .await;

    assert!(matches!(result, Err(AuthError::StateMismatch)));
    assert_eq!(browser.await.unwrap().0, StatusCode::BAD_REQUEST);
    assert!(exchange.codes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn denied_authorization_fails() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);
    let (url_tx, url_rx) = oneshot::channel();

    let browser = browser(url_rx, redirect.clone(), |state| {
        format!("error=access_denied&state={}", state)
    });
    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize(
            move |url| {
                let _ = url_tx.send(url.to_string());
            },
            never_cancel(),
        )
        .await;

    match result {
        Err(AuthError::Denied(reason)) => assert_eq!(reason, "access_denied"),
        other => panic!("unexpected result: {:?}", other.map(|t| t.access_token)),
    }
    assert_eq!(browser.await.unwrap().0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_code_fails() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);
    let (url_tx, url_rx) = oneshot::channel();

    let browser = browser(url_rx, redirect.clone(), |state| format!("state={}", state));
    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize(
            move |url| {
                let _ = url_tx.send(url.to_string());
            },
            never_cancel(),
        )
        .await;

    assert!(matches!(result, Err(AuthError::MissingCode)));
    browser.await.unwrap();
}

#[tokio::test]
async fn failed_exchange_fails_attempt() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);
    let (url_tx, url_rx) = oneshot::channel();

    let browser = browser(url_rx, redirect.clone(), |state| {
        format!("code=expired&state={}", state)
    });
    let result = flow(&redirect, Arc::new(FakeExchange::failing()))
        .authorize(
            move |url| {
                let _ = url_tx.send(url.to_string());
            },
            never_cancel(),
        )
        .await;

    assert!(matches!(result, Err(AuthError::Exchange(_))));
    assert_eq!(browser.await.unwrap().0, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn cancellation_wins_and_frees_the_port() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);

    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize(|_| {}, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            CancelReason::TimedOut
        })
        .await;

    assert!(matches!(
        result,
        Err(AuthError::Cancelled(CancelReason::TimedOut))
    ));
    assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
}

#[tokio::test]
async fn each_attempt_uses_a_fresh_state() {
    let port = free_port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);
    let flow = flow(&redirect, Arc::new(FakeExchange::ok()));
    let mut states = Vec::new();

    for _ in 0..2 {
        let (url_tx, url_rx) = oneshot::channel::<String>();
        let _ = flow
            .authorize(
                move |url| {
                    let _ = url_tx.send(url.to_string());
                },
                async { CancelReason::Aborted },
            )
            .await;
        let url = Url::parse(&url_rx.await.unwrap()).unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        states.push(state);
    }

    assert_ne!(states[0], states[1]);
}

#[tokio::test]
async fn non_loopback_redirect_is_rejected_before_prompt() {
    let result = flow(
        "http://example.com:8080/callback",
        Arc::new(FakeExchange::ok()),
    )
    .authorize(|_| panic!("prompt must not run"), never_cancel())
    .await;

    assert!(matches!(result, Err(AuthError::NonLoopbackRedirect(_))));
}

#[tokio::test]
async fn occupied_port_is_a_bind_error() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let redirect = format!("http://127.0.0.1:{}/callback", port);

    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize(|_| panic!("prompt must not run"), never_cancel())
        .await;

    assert!(matches!(result, Err(AuthError::Bind { .. })));
    drop(occupied);
}

#[tokio::test]
async fn session_phase_follows_the_outcome() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let redirect = format!(
        "http://127.0.0.1:{}/callback",
        occupied.local_addr().unwrap().port()
    );
    let mut session = AuthSession::new();
    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize_session(&mut session, |_| panic!("prompt must not run"), never_cancel())
        .await;
    assert!(matches!(result, Err(AuthError::Bind { .. })));
    assert_eq!(session.phase(), AuthPhase::Failed);
    drop(occupied);

    let redirect = format!("http://127.0.0.1:{}/callback", free_port());
    let mut session = AuthSession::new();
    let mut prompted = false;
    let result = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize_session(&mut session, |_| prompted = true, async {
            CancelReason::Aborted
        })
        .await;
    assert!(matches!(
        result,
        Err(AuthError::Cancelled(CancelReason::Aborted))
    ));
    assert!(prompted);
    assert_eq!(session.phase(), AuthPhase::Cancelled);
}

#[tokio::test]
async fn https_redirect_uses_self_signed_certificate() {
    let port = free_port();
    let redirect = format!("https://127.0.0.1:{}/callback", port);
    let (url_tx, url_rx) = oneshot::channel();

    let browser = browser(url_rx, redirect.clone(), |state| {
        format!("code=secure&state={}", state)
    });
    let token = flow(&redirect, Arc::new(FakeExchange::ok()))
        .authorize(
            move |url| {
                let _ = url_tx.send(url.to_string());
            },
            never_cancel(),
        )
        .await
        .unwrap();

    assert_eq!(token.access_token, "access-for-secure");
    assert_eq!(browser.await.unwrap().0, StatusCode::OK);
}
