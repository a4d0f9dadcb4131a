use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use naegong_db::now_ts;
use naegong_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{run_blocking, ApiError};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    // Check if username is taken
    {
        let db = state.clone();
        let username = req.username.clone();
        let taken = run_blocking(move || {
            Ok(db.db.get_profile_by_username(&username)?.is_some())
        })
        .await?;
        if taken {
            return Err(ApiError::Conflict("username is already taken".into()));
        }
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();

    let db = state.clone();
    let username = req.username.clone();
    run_blocking(move || {
        db.db
            .create_profile(&user_id.to_string(), &username, &password_hash, &now_ts())?;
        Ok(())
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let username = req.username.clone();
    let user = run_blocking(move || Ok(db.db.get_profile_by_username(&username)?))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt profile id: {}", e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use uuid::Uuid;

    use naegong_types::api::Claims;

    use super::create_token;

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "alice").unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user_id);
        assert_eq!(decoded.claims.username, "alice");
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = create_token("test-secret", Uuid::new_v4(), "alice").unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(decoded.is_err());
    }
}
