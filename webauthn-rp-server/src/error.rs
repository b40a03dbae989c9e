use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use webauthn_rp_core::error::{ErrorKind, WebauthnError};

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("User {0} Not Found")]
    UserNotFound(String),
    #[error("User Has No Credentials")]
    UserHasNoCredentials,
    #[error("No challenge is outstanding for this user")]
    NoChallenge,
    #[error("Credential is not registered to this user")]
    UnknownCredential,
    #[error(transparent)]
    Webauthn(#[from] WebauthnError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::Webauthn(e) if e.kind() == ErrorKind::CloneDetected => {
                warn!(error = %self, "rejected a possibly cloned authenticator");
            }
            _ => debug!(error = %self, "request failed"),
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
