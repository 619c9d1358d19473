pub(crate) use crate::auth::dto::{Claims, SessionKeys};
use crate::auth::repo_types::User;
use crate::config::SessionConfig;
use crate::mail::{self, EmailKind};
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Fixed validity window for verification and reset tokens.
pub const ISSUANCE_WINDOW: TimeDuration = TimeDuration::hours(1);

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Derives an opaque account-action token: a one-way hash of the user id
/// with a fresh random salt, so every issuance is unique and unguessable
/// even for the same account. Returns the token and its expiry.
pub fn issue_token(user_id: Uuid) -> anyhow::Result<(String, OffsetDateTime)> {
    let token = hash_password(&user_id.to_string())?;
    Ok((token, OffsetDateTime::now_utc() + ISSUANCE_WINDOW))
}

/// Issues a token for the given purpose, stores it on the user row
/// (overwriting any outstanding one), and hands the action link to the
/// mailer. Shared by signup and forgot-password.
pub async fn send_account_email(
    state: &AppState,
    user: &User,
    kind: EmailKind,
) -> anyhow::Result<()> {
    let (token, expiry) = issue_token(user.id)?;
    match kind {
        EmailKind::Verify => User::store_verify_token(&state.db, user.id, &token, expiry).await?,
        EmailKind::Reset => User::store_reset_token(&state.db, user.id, &token, expiry).await?,
    }
    let url = mail::action_url(&state.config.mail.domain, kind, &token);
    let email = mail::build_email(&user.email, &state.config.mail.from_email, kind, &url);
    state.mailer.send(&email).await
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}

/// Extracts the authenticated user id from the session cookie.
///
/// Unlike the gate, this *does* verify the JWT signature and expiry.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let token = crate::gate::session_token(&parts.headers)
            .filter(|t| !t.is_empty())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing session token".to_string()))?;

        let claims = match keys.verify(&token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired session token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        let msg = err.to_string();
        assert!(!msg.is_empty());
    }
}

#[cfg(test)]
mod token_tests {
    use super::*;

    #[test]
    fn issuance_is_unique_per_call() {
        let user_id = Uuid::new_v4();
        let (a, _) = issue_token(user_id).expect("issue");
        let (b, _) = issue_token(user_id).expect("issue");
        assert_ne!(a, b, "fresh salt must make every issuance distinct");
    }

    #[test]
    fn token_is_a_hash_of_the_user_id() {
        let user_id = Uuid::new_v4();
        let (token, _) = issue_token(user_id).expect("issue");
        assert!(verify_password(&user_id.to_string(), &token).expect("verify"));
        assert!(!verify_password(&Uuid::new_v4().to_string(), &token).expect("verify"));
    }

    #[test]
    fn expiry_is_one_hour_out() {
        let before = OffsetDateTime::now_utc();
        let (_, expiry) = issue_token(Uuid::new_v4()).expect("issue");
        let after = OffsetDateTime::now_utc();
        assert!(expiry >= before + ISSUANCE_WINDOW);
        assert!(expiry <= after + ISSUANCE_WINDOW);
    }

    #[test]
    fn email_regex_accepts_plausible_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email(""));
    }
}
