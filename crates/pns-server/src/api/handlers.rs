//! HTTP request handlers.

use super::middleware::Caller;
use super::types::{
    ActionResponse, ClaimRequest, ConfigResponse, CreateRecordRequest, DurationRequest,
    EventsResponse, HealthResponse, LinkResolverRequest, ResolversResponse, VerifyRequest,
};
use super::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Path, State},
    Json,
};
use pns_core::{PhoneHash, RecordView, Registry, RegistryResult};
use tracing::{error, info, warn};

/// Longest label accepted for a resolver entry.
const MAX_LABEL_LEN: usize = 64;

fn parse_phone_hash(raw: &str) -> Result<PhoneHash, ApiError> {
    Ok(raw.parse::<PhoneHash>()?)
}

fn decode_hex(field: &str, raw: &str) -> Result<Vec<u8>, ApiError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits).map_err(|e| ApiError::BadRequest(format!("invalid {}: {}", field, e)))
}

fn validate_label(label: &str) -> Result<&str, ApiError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ApiError::BadRequest("label must not be empty".into()));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(ApiError::BadRequest(format!(
            "label longer than {} bytes",
            MAX_LABEL_LEN
        )));
    }
    Ok(label)
}

/// Run a mutation under the write lock and persist the result.
///
/// If the snapshot cannot be written the in-memory state is rolled back and
/// the mutation's events are dropped, so the registry never acknowledges a
/// change it failed to store.
async fn commit<T>(
    state: &AppState,
    op: impl FnOnce(&mut Registry) -> RegistryResult<T>,
) -> Result<T, ApiError> {
    let mut registry = state.registry.write().await;
    let before = state
        .store
        .is_persistent()
        .then(|| registry.state().clone());

    let out = match op(&mut *registry) {
        Ok(out) => out,
        Err(e) => {
            state.pending.discard();
            return Err(e.into());
        }
    };

    if let Err(e) = state.store.save(registry.state()).await {
        error!("Failed to persist registry snapshot: {}", e);
        let dropped = state.pending.discard();
        if let Some(before) = before {
            registry.replace_state(before);
        }
        warn!(dropped, "Rolled back unsaved mutation");
        return Err(e);
    }

    state.pending.publish();
    Ok(out)
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.registry.read().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        record_count: registry.record_count(),
        now: registry.now(),
    })
}

/// Record the outcome of an OTP verification for a phone hash.
pub async fn set_verification_status(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(phone_hash): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;

    let message_hash: [u8; 32] = decode_hex("message_hash", &request.message_hash)?
        .try_into()
        .map_err(|_| ApiError::BadRequest("message_hash must be 32 bytes".into()))?;
    let signature = decode_hex("signature", &request.signature)?;

    commit(&state, |registry| {
        registry.set_verification_status(
            &caller,
            phone_hash,
            message_hash,
            request.status,
            &signature,
        )
    })
    .await?;

    info!(%phone_hash, %caller, "Verification accepted");

    let status = if request.status { "verified" } else { "unverified" };
    Ok(Json(ActionResponse::for_phone(
        phone_hash,
        status,
        "Verification status recorded.",
    )))
}

/// Create a record for a phone hash the caller has verified.
pub async fn create_record(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(phone_hash): Path<String>,
    Json(request): Json<CreateRecordRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;
    let label = validate_label(&request.label)?;

    commit(&state, |registry| {
        registry.create_record(phone_hash, caller, label)
    })
    .await?;

    Ok(Json(ActionResponse::for_phone(
        phone_hash,
        "active",
        "Phone record created.",
    )))
}

/// Read the lifecycle view of a record.
pub async fn get_record(
    State(state): State<AppState>,
    Path(phone_hash): Path<String>,
) -> Result<Json<RecordView>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;
    let registry = state.registry.read().await;

    Ok(Json(registry.get_record(&phone_hash)?))
}

/// Renew a record that is in its grace window.
pub async fn renew(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(phone_hash): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;

    commit(&state, |registry| registry.renew(&caller, phone_hash)).await?;

    Ok(Json(ActionResponse::for_phone(
        phone_hash,
        "active",
        "Phone record renewed.",
    )))
}

/// Hand a fully expired record to a new owner.
pub async fn claim(
    State(state): State<AppState>,
    Path(phone_hash): Path<String>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;
    let label = validate_label(&request.label)?;

    commit(&state, |registry| {
        registry.claim_expired_phone_record(
            phone_hash,
            request.new_owner,
            request.resolver,
            label,
        )
    })
    .await?;

    Ok(Json(ActionResponse::for_phone(
        phone_hash,
        "active",
        "Phone record claimed.",
    )))
}

/// Link an additional resolver address to a record.
pub async fn link_resolver(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(phone_hash): Path<String>,
    Json(request): Json<LinkResolverRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;
    let label = validate_label(&request.label)?;

    commit(&state, |registry| {
        registry.link_phone_to_wallet(&caller, phone_hash, request.address, label)
    })
    .await?;

    Ok(Json(ActionResponse::for_phone(
        phone_hash,
        "linked",
        "Resolver linked.",
    )))
}

/// List the resolver entries of a record.
pub async fn get_resolvers(
    State(state): State<AppState>,
    Path(phone_hash): Path<String>,
) -> Result<Json<ResolversResponse>, ApiError> {
    let phone_hash = parse_phone_hash(&phone_hash)?;
    let registry = state.registry.read().await;
    let resolvers = registry.get_resolver_details(&phone_hash);

    Ok(Json(ResolversResponse {
        phone_hash,
        total: resolvers.len(),
        resolvers,
    }))
}

/// Change the record lifetime (administrators only).
pub async fn set_expiry_time(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<DurationRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    commit(&state, |registry| {
        registry.set_expiry_time(&caller, request.duration_secs)
    })
    .await?;

    Ok(get_config(State(state)).await)
}

/// Change the grace window (administrators only).
pub async fn set_grace_period(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<DurationRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    commit(&state, |registry| {
        registry.set_grace_period(&caller, request.duration_secs)
    })
    .await?;

    Ok(get_config(State(state)).await)
}

/// Current lifecycle configuration.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let registry = state.registry.read().await;
    let authority = registry.authority();

    Json(ConfigResponse {
        expiry_duration_secs: authority.durations().expiry,
        grace_duration_secs: authority.durations().grace,
        duration_binding: authority.binding(),
        claim_requires_verification: authority.claim_policy().require_verification,
    })
}

/// Recently emitted registry events.
pub async fn list_events(State(state): State<AppState>) -> Json<EventsResponse> {
    let events = state.events.events();

    Json(EventsResponse {
        total: events.len(),
        events,
    })
}
