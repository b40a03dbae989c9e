use axum::{
    extract::{Json, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::instrument;
use webauthn_rp_core::proto::{
    PublicKeyCredential, PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions,
    RegisterPublicKeyCredential,
};

use crate::error::ServerError;
use crate::startup::{AppState, DEFAULT_USER_NAME};
use crate::store::UserRecord;

/*
 * Webauthn RP auth handlers.
 * These use webauthn-rp-core to process the data received from each route, and are closely
 * tied to axum. The flow for both ceremonies is the same:
 *
 *   1. The browser asks for options, and we store the challenge against the user.
 *   2. The browser passes the options to the authenticator, which signs over them.
 *   3. The browser posts the result back, and we take the challenge out of the store
 *      before verifying, so that it can only ever be used once.
 *   4. On success we persist the credential, or its new counter.
 */

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    username: Option<String>,
}

impl UserQuery {
    fn user_name(&self) -> &str {
        self.username.as_deref().unwrap_or(DEFAULT_USER_NAME)
    }
}

#[instrument(level = "debug", skip_all)]
pub async fn generate_registration_options(
    State(app_state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<PublicKeyCredentialCreationOptions>, ServerError> {
    let user_name = query.user_name();
    info!(%user_name, "start registration");

    // Since a user's name could change at anytime, we bind to a random unique id instead.
    let user = app_state.store.get_or_create_user(user_name).await;

    // Existing credentials are excluded so the same authenticator isn't registered twice.
    let options = app_state.webauthn.start_registration(
        user.id.as_bytes(),
        &user.name,
        None,
        &user.devices,
    )?;

    app_state
        .store
        .set_challenge(user_name, Some(options.challenge.clone()))
        .await?;

    Ok(Json(options))
}

async fn take_challenge(
    app_state: &AppState,
    user_name: &str,
) -> Result<(UserRecord, Vec<u8>), ServerError> {
    let user = app_state
        .store
        .get_user(user_name)
        .await
        .ok_or_else(|| ServerError::UserNotFound(user_name.to_string()))?;

    // The challenge is consumed whatever the outcome of verification.
    let challenge = app_state
        .store
        .take_challenge(user_name)
        .await?
        .ok_or(ServerError::NoChallenge)?;

    Ok((user, challenge.into()))
}

#[instrument(level = "debug", skip_all)]
pub async fn verify_registration(
    State(app_state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(reg): Json<RegisterPublicKeyCredential>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let user_name = query.user_name();
    let (_user, challenge) = take_challenge(&app_state, user_name).await?;

    let verified = app_state.webauthn.finish_registration(&reg, &challenge)?;

    info!(
        %user_name,
        fmt = %verified.fmt,
        aaguid = %verified.aaguid,
        "registration verified"
    );

    app_state
        .store
        .add_device(user_name, verified.credential)
        .await?;

    Ok(Json(serde_json::json!({ "verified": true })))
}

#[instrument(level = "debug", skip_all)]
pub async fn generate_authentication_options(
    State(app_state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<PublicKeyCredentialRequestOptions>, ServerError> {
    let user_name = query.user_name();
    info!(%user_name, "start authentication");

    let user = app_state
        .store
        .get_user(user_name)
        .await
        .ok_or_else(|| ServerError::UserNotFound(user_name.to_string()))?;

    if user.devices.is_empty() {
        return Err(ServerError::UserHasNoCredentials);
    }

    let options = app_state.webauthn.start_authentication(&user.devices)?;

    app_state
        .store
        .set_challenge(user_name, Some(options.challenge.clone()))
        .await?;

    Ok(Json(options))
}

#[instrument(level = "debug", skip_all)]
pub async fn verify_authentication(
    State(app_state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(auth): Json<PublicKeyCredential>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let user_name = query.user_name();
    let (user, challenge) = take_challenge(&app_state, user_name).await?;

    let mut device = user
        .devices
        .into_iter()
        .find(|d| d.cred_id == auth.raw_id)
        .ok_or(ServerError::UnknownCredential)?;

    let result = app_state
        .webauthn
        .finish_authentication(&auth, &challenge, &device)?;

    if device.update_credential(&result) == Some(true)
        && !app_state
            .store
            .update_counter(user_name, &device.cred_id, device.counter)
            .await?
    {
        // Another assertion for this credential already stored a counter at least this high.
        warn!(%user_name, counter = result.new_counter, "stored counter moved past this assertion");
    }

    info!(%user_name, counter = result.new_counter, "authentication verified");

    Ok(Json(serde_json::json!({ "verified": true })))
}

pub async fn in_memory(State(app_state): State<AppState>) -> Json<Vec<UserRecord>> {
    Json(app_state.store.users().await)
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/generate-registration-options",
            get(generate_registration_options),
        )
        .route("/verify-registration", post(verify_registration))
        .route(
            "/generate-authentication-options",
            get(generate_authentication_options),
        )
        .route("/verify-authentication", post(verify_authentication))
        .route("/in-memory", get(in_memory))
        .with_state(app_state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::startup::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use clap::Parser;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::try_parse_from([
            "webauthn-rp-server",
            "--rp-id",
            "localhost",
            "--rp-origin",
            "http://localhost:8081",
        ])
        .unwrap();
        router(AppState::new(&config).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn registration_options_store_challenge() {
        let app = app();

        let response = app
            .clone()
            .oneshot(
                Request::get("/generate-registration-options?username=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let options = body_json(response).await;
        assert_eq!(options["rp"]["id"], "localhost");
        assert_eq!(options["user"]["name"], "alice");
        assert!(options["challenge"].is_string());
        let algs: Vec<i64> = options["pubKeyCredParams"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["alg"].as_i64().unwrap())
            .collect();
        assert_eq!(algs, vec![-7, -257]);

        let response = app
            .oneshot(Request::get("/in-memory").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let users = body_json(response).await;
        assert_eq!(users[0]["name"], "alice");
        assert_eq!(users[0]["current_challenge"], options["challenge"]);
    }

    #[tokio::test]
    async fn verification_failures_are_bad_requests() {
        let app = app();

        // No credentials registered yet.
        let response = app
            .clone()
            .oneshot(
                Request::get("/generate-authentication-options")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        // Issue a challenge, then answer it with a response for another origin.
        let response = app
            .clone()
            .oneshot(
                Request::get("/generate-registration-options")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let options = body_json(response).await;
        let challenge = options["challenge"].as_str().unwrap();

        let client_data = serde_json::json!({
            "type": "webauthn.create",
            "challenge": challenge,
            "origin": "https://evil.example",
        })
        .to_string();
        let client_data = webauthn_rp_core::proto::Base64UrlSafeData::from(client_data.into_bytes());

        let reg = serde_json::json!({
            "id": "AQID",
            "rawId": "AQID",
            "response": {
                "attestationObject": "oA",
                "clientDataJSON": client_data.to_string(),
            },
            "type": "public-key",
            "clientExtensionResults": {},
        });

        let request = || {
            Request::post("/verify-registration")
                .header("content-type", "application/json")
                .body(Body::from(reg.to_string()))
                .unwrap()
        };

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("origin"));

        // The challenge was consumed by the failed attempt.
        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("challenge"));
    }
}
