use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{RegisterRequest, TokenRequest, UserWithToken},
    password::Password,
};
use crate::{
    error::ApiError,
    mailer::{Template, TemplateVars},
    state::AppState,
    store::{NewUser, StoreError},
};

/// POST /authentication/user
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserWithToken>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let mut password = Password::default();
    password.set(&payload.password)?;

    let plain_token = Uuid::new_v4().to_string();
    let new_user = NewUser {
        username: payload.username,
        email: payload.email,
        password,
    };
    let user = state
        .storage
        .users
        .create_and_invite(new_user, &plain_token, state.config.invitation_ttl())
        .await
        .map_err(|e| {
            warn!(error = %e, "register failed");
            ApiError::from(e)
        })?;

    let vars = TemplateVars {
        username: user.username.clone(),
        activation_url: format!("{}/confirm/{}", state.config.frontend_url, plain_token),
    };
    let sandbox = !state.config.is_production();
    if let Err(e) = state
        .mailer
        .send(Template::UserWelcome, &user.username, &user.email, &vars, sandbox)
        .await
    {
        error!(error = %e, user_id = user.id, "failed to send welcome email");
        if let Err(e) = state.storage.users.delete(user.id).await {
            error!(error = %e, user_id = user.id, "failed to delete user after mail failure");
        }
        return Err(ApiError::Internal);
    }

    info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(UserWithToken {
            user,
            token: plain_token,
        }),
    ))
}

/// POST /authentication/token
#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<String>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = match state.storage.users.get_by_email(&payload.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            warn!("token requested for unknown or inactive email");
            return Err(ApiError::Unauthorized);
        }
        Err(e) => return Err(e.into()),
    };

    if !user.password.verify(&payload.password) {
        warn!(user_id = user.id, "invalid password");
        return Err(ApiError::Unauthorized);
    }

    let token = state.jwt.sign(user.id)?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// PUT /users/activate/:token
#[instrument(skip(state, token))]
pub async fn activate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.users.activate(&token).await.map_err(|e| {
        warn!(error = %e, "activation failed");
        ApiError::from(e)
    })?;
    Ok(StatusCode::NO_CONTENT)
}
