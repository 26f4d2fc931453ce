use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use pil_ledger::{
    AdjustmentLedgerWriter, AdjustmentRequest, ApprovalRequest, AuditReport, LedgerAuditor,
    LedgerError, LineageProjection, LineageSummary, PayoutApprovalTransaction, PayoutPreview,
    PayoutPreviewComputer, StatusTransitions,
};
use pil_types::{
    BillingPeriod, ChainKey, ChainVerification, ConversionId, Decimal, Digest, DocumentMetadata,
    HashChainRecord, LedgerEntryId, LedgerStatus, PartnerId, PayoutLedgerEntry,
};

use crate::actor::Actor;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBody {
    pub partner_id: PartnerId,
    #[serde(flatten)]
    pub period: BillingPeriod,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
    pub partner_id: PartnerId,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub snapshot_hash: Digest,
    pub conversion_ids: Vec<ConversionId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBody {
    pub adjustment_amount: Decimal,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: LedgerStatus,
}

/// Document to record in a chain. Exactly one of `content` (UTF-8 text) or
/// `contentHex` (arbitrary bytes) must be set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecordBody {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_hex: Option<String>,
    pub metadata: DocumentMetadata,
}

impl ChainRecordBody {
    fn into_parts(self) -> ApiResult<(Vec<u8>, DocumentMetadata)> {
        let content = match (self.content, self.content_hex) {
            (Some(text), None) => text.into_bytes(),
            (None, Some(encoded)) => hex::decode(&encoded)
                .map_err(|e| ApiError::InvalidArgument(format!("contentHex: {e}")))?,
            _ => {
                return Err(ApiError::InvalidArgument(
                    "exactly one of content or contentHex is required".into(),
                ))
            }
        };
        Ok((content, self.metadata))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutAudit {
    pub entry: AuditReport,
    pub lineage: AuditReport,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidArgument(rejection.body_text()))
}

fn entry_id(raw: &str) -> ApiResult<LedgerEntryId> {
    Ok(LedgerEntryId::parse(raw)?)
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "pil-server",
        "version": env!("CARGO_PKG_VERSION"),
        "hashFunction": state.hash_function.to_string(),
    }))
}

pub async fn preview_handler(
    State(state): State<AppState>,
    payload: Result<Json<PreviewBody>, JsonRejection>,
) -> ApiResult<Json<PayoutPreview>> {
    let request = body(payload)?;
    let preview = PayoutPreviewComputer::new(state.ledger)
        .preview(&request.partner_id, &request.period)
        .await?;
    Ok(Json(preview))
}

pub async fn approve_handler(
    State(state): State<AppState>,
    Actor(approver_id): Actor,
    payload: Result<Json<ApproveBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PayoutLedgerEntry>)> {
    let request = body(payload)?;
    let entry = PayoutApprovalTransaction::new(state.ledger)
        .approve(ApprovalRequest {
            partner_id: request.partner_id,
            period: request.period,
            snapshot_hash: request.snapshot_hash,
            conversion_ids: request.conversion_ids,
            approver_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn adjust_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(approver_id): Actor,
    payload: Result<Json<AdjustBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PayoutLedgerEntry>)> {
    let payout_id = entry_id(&id)?;
    let request = body(payload)?;
    let entry = AdjustmentLedgerWriter::new(state.ledger)
        .create_adjustment(AdjustmentRequest {
            payout_id,
            adjustment_amount: request.adjustment_amount,
            reason: request.reason,
            approver_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<Json<PayoutLedgerEntry>> {
    let id = entry_id(&id)?;
    let request = body(payload)?;
    let entry = StatusTransitions::new(state.ledger)
        .transition(&id, request.status, &actor)
        .await?;
    Ok(Json(entry))
}

pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PayoutLedgerEntry>> {
    let id = entry_id(&id)?;
    let entry = state
        .ledger
        .store
        .entry(&id)
        .await
        .map_err(LedgerError::from)?
        .ok_or_else(|| LedgerError::NotFound(format!("entry {id}")))?;
    Ok(Json(entry))
}

pub async fn lineage_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LineageSummary>> {
    let id = entry_id(&id)?;
    Ok(Json(LineageProjection::new(state.ledger).summary(&id).await?))
}

pub async fn audit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PayoutAudit>> {
    let id = entry_id(&id)?;
    let auditor = LedgerAuditor::new(state.ledger);
    let entry = auditor.audit_entry(&id).await?;
    let lineage = auditor
        .audit_lineage(&entry.lineage.partner_id, &entry.lineage.period)
        .await?;
    Ok(Json(PayoutAudit { entry, lineage }))
}

/// Stream `{status, timestamp}` messages for one entry as server-sent
/// events. Only changes after the subscription are delivered.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let id = entry_id(&id)?;
    if state
        .ledger
        .store
        .entry(&id)
        .await
        .map_err(LedgerError::from)?
        .is_none()
    {
        return Err(LedgerError::NotFound(format!("entry {id}")).into());
    }
    let rx = state
        .events
        .subscribe(&id)
        .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

    let stream = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(message) => {
                let event = Event::default()
                    .event("status")
                    .json_data(&message)
                    .unwrap_or_else(|_| Event::default().comment("unencodable"));
                Some((Ok(event), rx))
            }
            Err(RecvError::Lagged(skipped)) => {
                Some((Ok(Event::default().comment(format!("lagged {skipped}"))), rx))
            }
            Err(RecvError::Closed) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

pub async fn create_chain_record_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Result<Json<ChainRecordBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<HashChainRecord>)> {
    let chain = ChainKey::new(key)?;
    let (content, metadata) = body(payload)?.into_parts()?;
    let record = state.chain.create(&chain, &content, metadata).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn verify_chain_record_handler(
    State(state): State<AppState>,
    Path((key, position)): Path<(String, String)>,
) -> ApiResult<Json<ChainVerification>> {
    let chain = ChainKey::new(key)?;
    let position: u64 = position
        .parse()
        .map_err(|_| ApiError::InvalidArgument(format!("position {position:?} is not a number")))?;
    Ok(Json(state.chain.verify_at(&chain, position).await?))
}

pub async fn verify_chain_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<ChainVerification>>> {
    let chain = ChainKey::new(key)?;
    Ok(Json(state.chain.verify_chain(&chain).await?))
}
