use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig};

/// Tokens are always minted with this algorithm.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

/// A freshly signed token and the instant its `exp` claim points at.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64).saturating_mul(60)),
        }
    }

    pub fn sign(&self, user_id: i64) -> anyhow::Result<IssuedToken> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let exp = now.saturating_add(ttl);
        let claims = Claims {
            user_id,
            iat: now,
            exp,
            jti: format!("{:032x}", rand::random::<u128>()),
        };
        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)?;
        debug!(user_id, "jwt signed");
        Ok(IssuedToken {
            token,
            // Row and claim must agree to the second.
            expires_at: OffsetDateTime::from_unix_timestamp(exp)?,
        })
    }

    /// Checks signature, algorithm family and `exp` (no leeway).
    /// Claim presence and types are enforced by deserializing into [`Claims`].
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = make_keys("dev-secret");
        let issued = keys.sign(42).expect("sign");
        let claims = keys.verify(&issued.token).expect("verify token");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp, issued.expires_at.unix_timestamp());
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let keys = make_keys("dev-secret");
        let a = keys.sign(1).unwrap();
        let b = keys.sign(1).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let good_keys = make_keys("same-secret");
        let bad_keys = make_keys("other-secret");
        let issued = good_keys.sign(7).expect("sign");
        assert!(bad_keys.verify(&issued.token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let keys = make_keys("dev-secret");
        let issued = keys.sign(7).expect("sign");
        let (signed, signature) = issued.token.rsplit_once('.').expect("three segments");
        let first = signature.chars().next().expect("non-empty signature");
        let swapped = if first == 'A' { 'B' } else { 'A' };
        let token = format!("{signed}.{swapped}{}", &signature[1..]);
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keys = make_keys("dev-secret");
        let victim = keys.sign(1).expect("sign");
        let attacker = keys.sign(2).expect("sign");
        let v: Vec<&str> = victim.token.split('.').collect();
        let a: Vec<&str> = attacker.token.split('.').collect();
        let forged = format!("{}.{}.{}", v[0], a[1], v[2]);
        assert!(keys.verify(&forged).is_err());
    }

    #[test]
    fn verify_rejects_non_hmac_algorithm() {
        let keys = make_keys("dev-secret");
        let issued = keys.sign(7).expect("sign");
        let parts: Vec<&str> = issued.token.split('.').collect();
        // {"alg":"RS256","typ":"JWT"}
        let rs256 = format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}.{}", parts[1], parts[2]);
        assert!(keys.verify(&rs256).is_err());
        // {"alg":"none","typ":"JWT"}
        let none = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{}.", parts[1]);
        assert!(keys.verify(&none).is_err());
    }

    #[test]
    fn verify_accepts_other_hmac_variants() {
        let keys = make_keys("dev-secret");
        let claims = Claims {
            user_id: 9,
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: OffsetDateTime::now_utc().unix_timestamp() + 60,
            jti: "x".into(),
        };
        let token = encode(&Header::new(Algorithm::HS512), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token).unwrap().user_id, 9);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            user_id: 7,
            iat: now - 120,
            exp: now - 1,
            jti: "expired".into(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn absurd_ttl_is_an_error_not_a_panic() {
        let keys = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            ttl_minutes: i64::MAX,
        });
        assert_eq!(keys.ttl, Duration::from_secs(u64::MAX));
        assert!(keys.sign(1).is_err());
    }

    #[test]
    fn verify_rejects_missing_or_mistyped_user_id() {
        #[derive(Serialize)]
        struct NoUser {
            iat: i64,
            exp: i64,
            jti: String,
        }
        #[derive(Serialize)]
        struct StringUser {
            #[serde(rename = "userID")]
            user_id: String,
            iat: i64,
            exp: i64,
            jti: String,
        }

        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let header = Header::new(Algorithm::HS256);

        let missing = encode(
            &header,
            &NoUser { iat: now, exp: now + 60, jti: "a".into() },
            &keys.encoding,
        )
        .unwrap();
        assert!(keys.verify(&missing).is_err());

        let mistyped = encode(
            &header,
            &StringUser { user_id: "7".into(), iat: now, exp: now + 60, jti: "b".into() },
            &keys.encoding,
        )
        .unwrap();
        assert!(keys.verify(&mistyped).is_err());
    }
}
