//! Request handlers for the verification API.
//!
//! Request and response bodies are camelCase on the wire. Handlers stay
//! thin: parse, call into the engine, map the outcome.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use verikit_engine::{Proof, Verdict, VerificationChallenge, VerificationStatus};
use verikit_lib::{ChallengeKind, SubjectId};

use crate::error::ApiError;
use crate::AppState;

type HandlerResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueChallengeRequest {
    pub kind: ChallengeKind,
    pub subject_id: String,
    pub address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub token: String,
    pub kind: ChallengeKind,
    pub subject_id: String,
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_amount_sats: Option<u64>,
    pub status: VerificationStatus,
    pub expires_at: i64,
}

impl From<VerificationChallenge> for ChallengeResponse {
    fn from(c: VerificationChallenge) -> Self {
        Self {
            token: c.token,
            kind: c.kind,
            subject_id: c.subject_id.as_str().to_string(),
            address: c.expected_address,
            expected_amount_sats: c.expected_amount_sats,
            status: c.status,
            expires_at: c.expires_at,
        }
    }
}

/// POST /verify/address/challenge
pub async fn issue_address_challenge(
    State(state): State<AppState>,
    Json(req): Json<IssueChallengeRequest>,
) -> HandlerResult<ChallengeResponse> {
    let challenge = state
        .onchain
        .issue(req.kind, SubjectId::from(req.subject_id.as_str()), req.address)?;
    Ok(Json(challenge.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTxidRequest {
    pub kind: ChallengeKind,
    pub subject_id: String,
    pub txid: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

impl From<Verdict> for VerdictResponse {
    fn from(v: Verdict) -> Self {
        let (txid, pubkey) = match v.proof {
            Some(Proof::OnchainPayment { txid }) => (Some(txid), None),
            Some(Proof::LightningKey { pubkey }) => (None, Some(pubkey)),
            None => (None, None),
        };
        Self {
            status: match v.status {
                verikit_engine::VerdictStatus::Pending => "pending",
                verikit_engine::VerdictStatus::Verified => "verified",
                verikit_engine::VerdictStatus::Failed => "failed",
            },
            reason: v.reason.map(|r| r.code()),
            txid,
            pubkey,
        }
    }
}

/// POST /verify/address
pub async fn submit_txid(
    State(state): State<AppState>,
    Json(req): Json<SubmitTxidRequest>,
) -> HandlerResult<VerdictResponse> {
    let verdict = state
        .onchain
        .verify(req.kind, &SubjectId::from(req.subject_id.as_str()), &req.txid)
        .await?;
    Ok(Json(verdict.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectQuery {
    pub kind: ChallengeKind,
    pub subject_id: String,
}

/// GET /verify/address/status
pub async fn address_status(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> HandlerResult<VerdictResponse> {
    let verdict = state
        .onchain
        .status(query.kind, &SubjectId::from(query.subject_id.as_str()))?;
    Ok(Json(verdict.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LnauthIssueQuery {
    pub subject_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LnauthChallengeResponse {
    pub k1: String,
    pub lnurl: String,
    pub qr_payload: String,
    pub callback_url: String,
    pub expires_at: i64,
}

/// GET /verify/lnauth/challenge
pub async fn issue_lnauth_challenge(
    State(state): State<AppState>,
    Query(query): Query<LnauthIssueQuery>,
) -> HandlerResult<LnauthChallengeResponse> {
    let issued = state
        .lnauth
        .issue_challenge(SubjectId::from(query.subject_id.as_str()))?;
    Ok(Json(LnauthChallengeResponse {
        k1: issued.k1,
        lnurl: issued.lnurl,
        qr_payload: issued.qr_payload,
        callback_url: issued.callback_url,
        expires_at: issued.expires_at,
    }))
}

#[derive(Deserialize)]
pub struct LnauthCallbackQuery {
    pub k1: String,
    pub sig: String,
    /// The wallet's linking key; LUD-04 names this parameter `key`.
    pub key: String,
}

#[derive(Serialize)]
pub struct LnauthCallbackResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// GET /verify/lnauth/callback
///
/// The wallet-facing LUD-04 endpoint. Always answers 200 with an
/// `OK`/`ERROR` body; wallets show `reason` to the user verbatim.
pub async fn lnauth_callback(
    State(state): State<AppState>,
    Query(query): Query<LnauthCallbackQuery>,
) -> Json<LnauthCallbackResponse> {
    let response = match state.lnauth.verify_signature(&query.k1, &query.sig, &query.key) {
        Ok(verdict) if verdict.is_verified() => LnauthCallbackResponse {
            status: "OK",
            reason: None,
        },
        Ok(verdict) => LnauthCallbackResponse {
            status: "ERROR",
            reason: Some(
                verdict
                    .reason
                    .map(|r| r.code().to_string())
                    .unwrap_or_else(|| "signature rejected".to_string()),
            ),
        },
        Err(e) => LnauthCallbackResponse {
            status: "ERROR",
            reason: Some(e.to_string()),
        },
    };
    Json(response)
}

#[derive(Deserialize)]
pub struct LnauthSignatureRequest {
    pub k1: String,
    pub sig: String,
    pub pubkey: String,
}

/// POST /verify/lnauth/signature
///
/// Browser-facing variant of the callback, for clients that captured the
/// signature themselves. Unlike the wallet endpoint this uses the regular
/// error mapping.
pub async fn submit_lnauth_signature(
    State(state): State<AppState>,
    Json(req): Json<LnauthSignatureRequest>,
) -> HandlerResult<VerdictResponse> {
    let verdict = state
        .lnauth
        .verify_signature(&req.k1, &req.sig, &req.pubkey)?;
    Ok(Json(verdict.into()))
}

#[derive(Deserialize)]
pub struct LnauthStatusQuery {
    pub k1: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LnauthStatusResponse {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    pub expires_at: i64,
}

/// GET /verify/lnauth/status
pub async fn lnauth_status(
    State(state): State<AppState>,
    Query(query): Query<LnauthStatusQuery>,
) -> HandlerResult<LnauthStatusResponse> {
    let status = state.lnauth.poll_status(&query.k1)?;
    Ok(Json(LnauthStatusResponse {
        status: status.status,
        pubkey: status.pubkey,
        expires_at: status.expires_at,
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub challenges: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        challenges: state.registry.len(),
    })
}
