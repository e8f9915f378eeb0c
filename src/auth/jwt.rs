use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signing and verification keys plus the fixed claim values.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    /// Signs a token for `email`. `lifetime` overrides the configured TTL.
    pub fn issue(&self, email: &str, lifetime: Option<Duration>) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + lifetime.unwrap_or(self.ttl);
        let claims = Claims {
            sub: email.to_owned(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("sign token: {e}"))?;
        debug!(email = %email, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(reason = ?e.kind(), "jwt rejected");
            AppError::InvalidCredentials
        })?;
        // jsonwebtoken only rejects once `exp < now`; the token dies at `exp`.
        let now = OffsetDateTime::now_utc().unix_timestamp().max(0) as usize;
        if data.claims.exp <= now {
            warn!(exp = data.claims.exp, "jwt expired");
            return Err(AppError::InvalidCredentials);
        }
        if data.claims.sub.is_empty() {
            warn!("jwt without subject");
            return Err(AppError::InvalidCredentials);
        }
        debug!(email = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn issue_and_verify_round_trip_identity() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.issue("alice@x.com", None).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "alice@x.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn lifetime_override_is_in_effect() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys
            .issue("alice@x.com", Some(Duration::seconds(90)))
            .unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 90);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys
            .issue("alice@x.com", Some(Duration::seconds(-5)))
            .unwrap();
        assert!(matches!(
            keys.verify(&token),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn token_is_dead_at_its_expiry_second() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue("alice@x.com", Some(Duration::ZERO)).unwrap();
        assert!(matches!(
            keys.verify(&token),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let ours = make_keys("ours", "iss", "aud");
        let theirs = make_keys("theirs", "iss", "aud");
        let token = theirs.issue("alice@x.com", None).unwrap();
        assert!(matches!(
            ours.verify(&token),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue("alice@x.com", None).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(
            keys.verify("not.a.jwt"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn token_without_subject_is_rejected() {
        #[derive(serde::Serialize)]
        struct NoSub {
            exp: usize,
            iss: String,
            aud: String,
        }
        let keys = make_keys("dev-secret", "iss", "aud");
        let exp = (OffsetDateTime::now_utc() + Duration::minutes(5)).unix_timestamp() as usize;
        let token = encode(
            &Header::new(ALGORITHM),
            &NoSub {
                exp,
                iss: "iss".into(),
                aud: "aud".into(),
            },
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(
            keys.verify(&token),
            Err(AppError::InvalidCredentials)
        ));
    }
}
