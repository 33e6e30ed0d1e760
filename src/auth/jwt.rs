use crate::models::{Claims, TokenType};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    token_type: TokenType,
    user_id: u64,
    email: &str,
    role: u8,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id,
        sub: email.to_string(),
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    user_id: u64,
    email: &str,
    role: u8,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    issue(TokenType::Access, user_id, email, role, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    user_id: u64,
    email: &str,
    role: u8,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    issue(TokenType::Refresh, user_id, email, role, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_claims() {
        let (token, issued) = generate_refresh_token(11, "asha@hostel.in", 2, "s3cret", 120).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.user_id, 11);
        assert_eq!(claims.sub, "asha@hostel.in");
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let (_, a) = generate_refresh_token(1, "a@b.c", 2, "k", 60).unwrap();
        let (_, b) = generate_refresh_token(1, "a@b.c", 2, "k", 60).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn tampered_token_fails() {
        let token = generate_access_token(1, "a@b.c", 2, "k", 60).unwrap();
        assert!(verify_token(&format!("{token}x"), "k").is_err());
    }
}
