/*!
Authentication primitives: password hashing and bearer tokens.

Passwords are hashed with salted Argon2 into PHC strings before they touch
the credential store; the plaintext is never stored or logged. Tokens are
stateless HS256 JWTs carrying exactly `{sub, role, exp}`, signed with one
process-wide secret for both roles. There is no revocation list; a token
is good until its expiry.
*/
use argon2::{
    Argon2,
    password_hash::{
        rand_core::OsRng,
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use jsonwebtoken::{
    decode, encode,
    errors::ErrorKind,
    Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::account::Role;

/// How token verification can fail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AuthError {
    /// The token was well-formed and correctly signed, but its expiry
    /// has passed.
    Expired,
    /// Bad signature or unrecognizable structure.
    Invalid,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AuthError::Expired => write!(f, "token expired"),
            AuthError::Invalid => write!(f, "token invalid"),
        }
    }
}

/// Hash `plaintext` into a salted PHC string.
///
/// Hashing the same plaintext twice yields different strings; the salt is
/// drawn fresh from the OS each call.
pub fn hash_password(plaintext: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| format!("Error hashing password: {}", &e))?
        .to_string();

    Ok(hash)
}

/// Check `plaintext` against a stored PHC string.
///
/// Returns false for a wrong password _and_ for a malformed stored hash;
/// nothing propagates past this boundary.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("Stored password hash unparseable: {}", &e);
            return false;
        },
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// The claim set embedded in every issued token.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id in the role's own table.
    pub sub: i64,
    pub role: Role,
    /// Absolute expiry, seconds since the epoch.
    pub exp: i64,
}

/**
Mints and verifies bearer tokens.

One of these is built at startup from the configured secret and default
TTL and carried around in the `Glob`.
*/
pub struct TokenMint {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_minutes: i64,
}

impl std::fmt::Debug for TokenMint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // The keys stay out of Debug output.
        write!(f, "TokenMint {{ ttl_minutes: {} }}", &self.ttl_minutes)
    }
}

impl TokenMint {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    /// Issue a token for the given account with the mint's default TTL.
    pub fn issue(&self, sub: i64, role: Role) -> Result<String, String> {
        self.issue_with_ttl(sub, role, self.ttl_minutes)
    }

    /// Issue a token expiring `ttl_minutes` from now.
    pub fn issue_with_ttl(
        &self,
        sub: i64,
        role: Role,
        ttl_minutes: i64,
    ) -> Result<String, String> {
        log::trace!(
            "TokenMint::issue_with_ttl( {}, {}, {} ) called.",
            &sub, &role, &ttl_minutes
        );

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| format!("System clock before epoch: {}", &e))?
            .as_secs() as i64;
        let claims = Claims {
            sub,
            role,
            exp: now + (ttl_minutes * 60),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| format!("Error encoding token: {}", &e))
    }

    /// Verify a presented token and recover its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::Invalid),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    static SECRET: &str = "a-test-secret-nobody-should-deploy";

    #[test]
    fn hashes_are_salted() {
        ensure_logging();

        let a = hash_password("swordfish").unwrap();
        let b = hash_password("swordfish").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("swordfish", &a));
        assert!(verify_password("swordfish", &b));
    }

    #[test]
    fn verify_rejects_bad_input() {
        ensure_logging();

        let hash = hash_password("swordfish").unwrap();
        assert!(!verify_password("sawfish", &hash));
        assert!(!verify_password("swordfish", "not a PHC string at all"));
        assert!(!verify_password("swordfish", ""));
    }

    #[test]
    fn token_round_trip() {
        ensure_logging();

        let mint = TokenMint::new(SECRET, 60);
        let token = mint.issue(17, Role::User).unwrap();
        let claims = mint.verify(&token).unwrap();
        assert_eq!(claims.sub, 17);
        assert_eq!(claims.role, Role::User);

        let token = mint.issue(1, Role::Admin).unwrap();
        assert_eq!(mint.verify(&token).unwrap().role, Role::Admin);
    }

    #[test]
    fn token_expiry() {
        ensure_logging();

        let mint = TokenMint::new(SECRET, 60);
        let stale = mint.issue_with_ttl(17, Role::User, -5).unwrap();
        assert_eq!(mint.verify(&stale), Err(AuthError::Expired));
    }

    #[test]
    fn token_tampering() {
        ensure_logging();

        let mint = TokenMint::new(SECRET, 60);
        let other = TokenMint::new("some-entirely-different-secret", 60);

        let token = mint.issue(17, Role::User).unwrap();
        assert_eq!(other.verify(&token), Err(AuthError::Invalid));
        assert_eq!(mint.verify("complete.garbage.here"), Err(AuthError::Invalid));
        assert_eq!(mint.verify(""), Err(AuthError::Invalid));
    }
}
