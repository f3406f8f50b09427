use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{NewUser, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the HS256 tokens issued by the identity provider. The profile claims are
/// used once, to create the local account of a subject seen for the first time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID, which is also the primary key of `users`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Using it as a handler argument makes
/// the route login-only: extraction failure redirects the visitor to the login page with
/// the current path as `next`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Viewer
///
/// "Current user or anonymous" for pages that anyone may see but that render differently
/// for the author. Missing or invalid credentials mean anonymous; only a failed account
/// lookup rejects.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let Some(credentials) = resolve_credentials(parts, &config) else {
            return Err(login_required(parts, &config));
        };

        let user = match repo.get_user(credentials.subject()).await? {
            Some(user) => Some(user),
            None => match &credentials {
                Credentials::Token(claims) => provision_user(&repo, claims).await?,
                // The bypass names existing accounts only.
                Credentials::Local(_) => None,
            },
        };

        match user {
            Some(user) => Ok(AuthUser {
                id: user.id,
                username: user.username,
            }),
            None => {
                tracing::debug!(user_id = %credentials.subject(), "No local account for request");
                Err(login_required(parts, &config))
            }
        }
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Viewer(Some(user))),
            Err(AppError::LoginRequired(_)) => Ok(Viewer(None)),
            Err(e) => Err(e),
        }
    }
}

/// What the request presented as proof of identity.
enum Credentials {
    /// `x-user-id` development bypass.
    Local(Uuid),
    Token(Claims),
}

impl Credentials {
    fn subject(&self) -> Uuid {
        match self {
            Credentials::Local(id) => *id,
            Credentials::Token(claims) => claims.sub,
        }
    }
}

/// The local `x-user-id` bypass first (only in `Env::Local`), then a Bearer JWT.
fn resolve_credentials(parts: &Parts, config: &AppConfig) -> Option<Credentials> {
    if config.env == Env::Local {
        let bypass = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(id) = bypass {
            return Some(Credentials::Local(id));
        }
    }

    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))?;

    decode_token(token, &config.jwt_secret).map(Credentials::Token)
}

const USERNAME_MAX_LEN: usize = 150;

/// Creates the local account of a token subject seen for the first time. The provider's
/// `preferred_username` is kept when it is usable in a profile URL and still free;
/// otherwise the account gets `user_<uuid>`.
async fn provision_user(repo: &RepositoryState, claims: &Claims) -> Result<Option<User>, AppError> {
    let fallback = format!("user_{}", claims.sub.simple());
    let mut candidates = vec![fallback];
    if let Some(preferred) = claims.preferred_username.as_deref().and_then(usable_username) {
        candidates.insert(0, preferred);
    }

    for username in candidates {
        let new_user = NewUser {
            id: claims.sub,
            username,
            email: claims.email.clone().unwrap_or_default(),
        };
        if let Some(user) = repo.insert_user_if_absent(new_user).await? {
            tracing::info!(user_id = %user.id, username = %user.username, "Local account ready");
            return Ok(Some(user));
        }
    }
    Ok(None)
}

/// A username that is non-empty, short enough, and made of URL-safe characters. `edit`
/// is taken by the `/profile/edit/` route.
fn usable_username(raw: &str) -> Option<String> {
    let name = raw.trim();
    let allowed = |c: char| c.is_ascii_alphanumeric() || "@.+-_".contains(c);
    (!name.is_empty()
        && name.len() <= USERNAME_MAX_LEN
        && name != "edit"
        && name.chars().all(allowed))
    .then(|| name.to_string())
}

/// Validates signature and expiry, returning the claims.
pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired token"),
                kind => tracing::debug!(?kind, "Rejected invalid token"),
            }
            None
        }
    }
}

fn login_required(parts: &Parts, config: &AppConfig) -> AppError {
    let next = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    AppError::LoginRequired(config.login_redirect(next))
}
