//! Discord API Handlers
//!
//! The interaction endpoint takes the raw body: the signature covers the
//! exact bytes sent.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ChatAccount, ChatLoginRequest, ChatOrder};
use shared::util::now_millis;

use crate::auth::verify_password;
use crate::db::repository::chat as chat_repo;
use crate::discord::interaction::{INTERACTION_APPLICATION_COMMAND, INTERACTION_PING};
use crate::discord::verify::check_timestamp;
use crate::discord::{self, Interaction, InteractionResponse};
use crate::security_log;
use crate::state::AppState;
use crate::utils::validation::normalize_email;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/discord/interactions
pub async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<InteractionResponse>> {
    let verifier = state.discord.as_ref().ok_or_else(|| {
        AppError::with_message(ErrorCode::ConfigError, "Chat interactions are not configured")
    })?;

    let (Some(signature), Some(timestamp)) = (
        header(&headers, SIGNATURE_HEADER),
        header(&headers, TIMESTAMP_HEADER),
    ) else {
        security_log!("WARN", "interaction_unsigned", body_len = body.len());
        return Err(AppError::new(ErrorCode::SignatureInvalid));
    };

    if let Err(e) = verifier.verify(signature, timestamp, &body) {
        security_log!("WARN", "interaction_bad_signature", timestamp = timestamp.to_owned());
        return Err(e);
    }
    if let Err(e) = check_timestamp(timestamp, chrono::Utc::now().timestamp()) {
        security_log!("WARN", "interaction_stale", timestamp = timestamp.to_owned());
        return Err(e);
    }

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| AppError::invalid_request(format!("Malformed interaction: {e}")))?;

    match interaction.kind {
        INTERACTION_PING => Ok(Json(InteractionResponse::pong())),
        INTERACTION_APPLICATION_COMMAND => {
            let command = interaction.data.as_ref().map(|d| d.name.as_str()).unwrap_or("");
            tracing::info!(command, "Chat command received");
            Ok(Json(discord::dispatch(state.pool(), &interaction).await))
        }
        other => Err(AppError::invalid_request(format!(
            "Unsupported interaction type {other}"
        ))),
    }
}

/// POST /api/discord/login
///
/// Same delay and uniform error as the storefront login; inactive accounts
/// cannot sign in.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<ChatLoginRequest>,
) -> AppResult<Json<ChatAccount>> {
    let email = normalize_email(&req.email);
    let account = chat_repo::find_account_by_email(state.pool(), &email).await?;

    tokio::time::sleep(state.login_delay).await;

    let account = match account {
        Some(a) if a.is_active && verify_password(&req.password, &a.password_hash) => a,
        found => {
            security_log!(
                "WARN",
                "chat_login_failed",
                email = email.clone(),
                reason = match &found {
                    None => "unknown_email",
                    Some(a) if !a.is_active => "inactive",
                    Some(_) => "invalid_password",
                }
            );
            return Err(AppError::invalid_credentials());
        }
    };

    let account = chat_repo::record_login(state.pool(), account.id, now_millis()).await?;
    tracing::info!(account_id = account.id, discord_id = %account.discord_id, "Chat account signed in");
    Ok(Json(account))
}

/// GET /api/discord/accounts/{discord_id}/orders
pub async fn account_orders(
    State(state): State<AppState>,
    Path(discord_id): Path<String>,
) -> AppResult<Json<Vec<ChatOrder>>> {
    Ok(Json(
        chat_repo::list_orders_by_discord_id(state.pool(), &discord_id).await?,
    ))
}
