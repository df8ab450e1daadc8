//! API-level tests driving the router with in-memory requests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::{json, Value};
use tower::ServiceExt;

use verikit_http::{router, AppState};
use verikit_lib::chain::MockChainProvider;
use verikit_lib::config::{LnurlServerConfig, VerificationConfig};
use verikit_lib::Txid;

const ADDRESS: &str = "bc1qdirectorydest";

fn setup() -> (Router, Arc<MockChainProvider>) {
    let chain = Arc::new(MockChainProvider::new());
    let state = AppState::new(
        chain.clone(),
        LnurlServerConfig::new("directory.example.com"),
        &VerificationConfig::default().with_review_range(2_500, 2_500),
    );
    (router(state), chain)
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn txid(byte: &str) -> String {
    byte.repeat(32)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = setup();
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn store_verification_over_http() {
    let (app, chain) = setup();

    let (status, body) = call(
        &app,
        post_json(
            "/verify/address/challenge",
            json!({"kind": "store-ownership", "subjectId": "store-1", "address": ADDRESS}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expectedAmountSats"], 5_000);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["subjectId"], "store-1");

    // Not paid yet: the submission stays pending.
    let (status, body) = call(
        &app,
        post_json(
            "/verify/address",
            json!({"kind": "store-ownership", "subjectId": "store-1", "txid": txid("aa")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["reason"], "AWAITING_CONFIRMATION");

    chain.insert_payment(&Txid::parse(&txid("aa")).unwrap(), ADDRESS, 5_000, 1);
    let (status, body) = call(
        &app,
        post_json(
            "/verify/address",
            json!({"kind": "store-ownership", "subjectId": "store-1", "txid": txid("aa")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verified");
    assert_eq!(body["txid"], txid("aa"));

    let (status, body) = call(
        &app,
        get("/verify/address/status?kind=store-ownership&subjectId=store-1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verified");
}

#[tokio::test]
async fn malformed_txid_is_a_failed_verdict_not_an_error() {
    let (app, _) = setup();
    call(
        &app,
        post_json(
            "/verify/address/challenge",
            json!({"kind": "store-ownership", "subjectId": "store-1", "address": ADDRESS}),
        ),
    )
    .await;

    let (status, body) = call(
        &app,
        post_json(
            "/verify/address",
            json!({"kind": "store-ownership", "subjectId": "store-1", "txid": "garbage"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "INVALID_TXID_FORMAT");
}

#[tokio::test]
async fn unknown_subject_is_404() {
    let (app, _) = setup();
    let (status, body) = call(
        &app,
        post_json(
            "/verify/address",
            json!({"kind": "store-ownership", "subjectId": "nobody", "txid": txid("aa")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "CHALLENGE_NOT_FOUND");
}

#[tokio::test]
async fn chain_outage_is_503() {
    let (app, chain) = setup();
    call(
        &app,
        post_json(
            "/verify/address/challenge",
            json!({"kind": "store-ownership", "subjectId": "store-1", "address": ADDRESS}),
        ),
    )
    .await;
    chain.set_unreachable(true);

    let (status, body) = call(
        &app,
        post_json(
            "/verify/address",
            json!({"kind": "store-ownership", "subjectId": "store-1", "txid": txid("aa")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn lnauth_wallet_round_over_http() {
    let (app, _) = setup();

    let (status, body) = call(&app, get("/verify/lnauth/challenge?subjectId=rev-1")).await;
    assert_eq!(status, StatusCode::OK);
    let k1 = body["k1"].as_str().unwrap().to_string();
    assert!(body["lnurl"].as_str().unwrap().starts_with("lnurl1"));
    assert_eq!(
        body["qrPayload"].as_str().unwrap(),
        body["lnurl"].as_str().unwrap().to_uppercase()
    );
    assert!(body["callbackUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://directory.example.com/verify/lnauth/callback"));

    let (status, body) = call(&app, get(&format!("/verify/lnauth/status?k1={}", k1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(&[0x42u8; 32]).unwrap();
    let pubkey = hex::encode(PublicKey::from_secret_key(&secp, &sk).serialize());
    let digest: [u8; 32] = hex::decode(&k1).unwrap().try_into().unwrap();
    let sig = hex::encode(
        secp.sign_ecdsa(&Message::from_digest_slice(&digest).unwrap(), &sk)
            .serialize_der(),
    );

    // Wallet hits the LUD-04 callback.
    let (status, body) = call(
        &app,
        get(&format!(
            "/verify/lnauth/callback?tag=login&k1={}&sig={}&key={}&action=login",
            k1, sig, pubkey
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = call(&app, get(&format!("/verify/lnauth/status?k1={}", k1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verified");
    assert_eq!(body["pubkey"], pubkey);

    // Replayed callback: the consumed nonce reads as unknown, and the
    // wallet endpoint reports it in-band per LUD-04.
    let (status, body) = call(
        &app,
        get(&format!(
            "/verify/lnauth/callback?k1={}&sig={}&key={}",
            k1, sig, pubkey
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ERROR");
}

#[tokio::test]
async fn lnauth_bad_signature_via_post() {
    let (app, _) = setup();
    let (_, body) = call(&app, get("/verify/lnauth/challenge?subjectId=rev-1")).await;
    let k1 = body["k1"].as_str().unwrap().to_string();
    let (_, other) = call(&app, get("/verify/lnauth/challenge?subjectId=rev-2")).await;
    let other_k1 = other["k1"].as_str().unwrap().to_string();

    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(&[0x42u8; 32]).unwrap();
    let pubkey = hex::encode(PublicKey::from_secret_key(&secp, &sk).serialize());
    // Signature over the wrong nonce
    let digest: [u8; 32] = hex::decode(&other_k1).unwrap().try_into().unwrap();
    let sig = hex::encode(
        secp.sign_ecdsa(&Message::from_digest_slice(&digest).unwrap(), &sk)
            .serialize_der(),
    );

    let (status, body) = call(
        &app,
        post_json(
            "/verify/lnauth/signature",
            json!({"k1": k1, "sig": sig, "pubkey": pubkey}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn lnauth_malformed_signature_is_400() {
    let (app, _) = setup();
    let (_, body) = call(&app, get("/verify/lnauth/challenge?subjectId=rev-1")).await;
    let k1 = body["k1"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        post_json(
            "/verify/lnauth/signature",
            json!({"k1": k1, "sig": "not-hex", "pubkey": "02ab"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");
}
