use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// Stateless bearer token claims: just the subject and the validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl KeyPair {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }
}

/// Access and refresh keys are fully disjoint: separate secrets, separate
/// lifetimes. A refresh token can never pass access verification and vice
/// versa.
pub struct TokenKeys {
    access: KeyPair,
    refresh: KeyPair,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        Self {
            access: KeyPair::new(&jwt.access_secret, jwt.access_ttl_secs),
            refresh: KeyPair::new(&jwt.refresh_secret, jwt.refresh_ttl_secs),
        }
    }
}

fn sign(pair: &KeyPair, user_id: Uuid) -> anyhow::Result<String> {
    let now = OffsetDateTime::now_utc();
    let exp = now + Duration::seconds(pair.ttl_secs);
    let claims = Claims {
        sub: user_id,
        iat: now.unix_timestamp() as usize,
        exp: exp.unix_timestamp() as usize,
    };
    let token = encode(&Header::default(), &claims, &pair.encoding)?;
    Ok(token)
}

fn verify(pair: &KeyPair, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(token, &pair.decoding, &Validation::default())?;
    Ok(data.claims)
}

impl TokenKeys {
    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        let token = sign(&self.access, user_id)?;
        debug!(%user_id, "access token signed");
        Ok(token)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        let token = sign(&self.refresh, user_id)?;
        debug!(%user_id, "refresh token signed");
        Ok(token)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        verify(&self.access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        verify(&self.refresh, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> TokenKeys {
        TokenKeys {
            access: KeyPair::new("access-secret", 300),
            refresh: KeyPair::new("refresh-secret", 3600),
        }
    }

    #[test]
    fn access_round_trip_returns_subject() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify_access(&token).expect("verify access");
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_round_trip_returns_subject() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id).expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn secrets_are_disjoint_between_classes() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();

        let refresh = keys.sign_refresh(user_id).expect("sign refresh");
        assert!(keys.verify_access(&refresh).is_err());

        let access = keys.sign_access(user_id).expect("sign access");
        assert!(keys.verify_refresh(&access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // jsonwebtoken's default validation keeps 60s of leeway
        let keys = TokenKeys {
            access: KeyPair::new("access-secret", -120),
            refresh: KeyPair::new("refresh-secret", 3600),
        };
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        assert!(keys.verify_access(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = make_keys();
        assert!(keys.verify_access("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn fresh_state_keys_come_from_config() {
        let state = crate::state::AppState::fake();
        let keys = TokenKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        assert_eq!(keys.verify_access(&token).unwrap().sub, user_id);
    }
}
