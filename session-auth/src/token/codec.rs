use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Algorithm;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use super::claims::ClaimSet;
use super::errors::EncodingError;
use super::errors::TokenError;
use super::keys::parse_algorithm;
use super::keys::KeyRing;
use super::keys::SigningKey;

/// Value of the `typ` header field on every token.
pub const TOKEN_TYPE_HEADER: &str = "TOKEN";

/// Signed bearer token: `<header>.<claims>.<signature>`, each base64url.
///
/// `Debug` does not print the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"<redacted>").finish()
    }
}

/// Header as written on encode. Field order is part of the wire format.
#[derive(Serialize)]
struct EncodedHeader {
    alg: Algorithm,
    typ: &'static str,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
    typ: Option<String>,
}

struct Segments<'a> {
    header: &'a str,
    claims: &'a str,
    signature: &'a str,
    signed: &'a str,
}

impl<'a> Segments<'a> {
    fn split(token: &'a str) -> Result<Self, TokenError> {
        let (signed, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, claims) = signed.split_once('.').ok_or(TokenError::Malformed)?;

        if header.is_empty() || claims.is_empty() || signature.is_empty() || claims.contains('.')
        {
            return Err(TokenError::Malformed);
        }

        Ok(Self {
            header,
            claims,
            signature,
            signed,
        })
    }
}

/// Token encoder and verifier.
///
/// Stateless; keys are passed in on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode and sign claims.
    ///
    /// # Arguments
    /// * `claims` - Claims to encode
    /// * `key` - Key to sign with
    ///
    /// # Returns
    /// Signed token
    ///
    /// # Errors
    /// * `InvalidLifetime`, `ReservedClaim`, `NonFiniteClaim` - Claims cannot be encoded
    /// * `Serialization` - A segment could not be written as JSON
    /// * `Signing` - Signing failed
    pub fn encode(&self, claims: &ClaimSet, key: &SigningKey) -> Result<Token, EncodingError> {
        claims.validate()?;

        let header = EncodedHeader {
            alg: key.algorithm(),
            typ: TOKEN_TYPE_HEADER,
        };
        let signed = format!("{}.{}", encode_json(&header)?, encode_json(claims)?);

        let signature =
            jsonwebtoken::crypto::sign(signed.as_bytes(), key.encoding_key(), key.algorithm())
                .map_err(|e| EncodingError::Signing(e.to_string()))?;

        Ok(Token(format!("{signed}.{signature}")))
    }

    /// Verify a token and return its claims.
    ///
    /// Checks run in order: structure, algorithm, signature (current key first,
    /// then retired keys still inside their grace period), expiry. Nothing is
    /// returned unless every check passes.
    ///
    /// # Arguments
    /// * `token` - Token string as presented by the client
    /// * `keys` - Key ring snapshot
    /// * `now` - Verification time (Unix seconds)
    ///
    /// # Errors
    /// * `Malformed` - Not three base64url segments, bad JSON, or bad `typ`
    /// * `UnsupportedAlgorithm` - Header names an algorithm outside HS256/384/512
    /// * `SignatureInvalid` - No usable key produced the signature
    /// * `Expired` - `exp` is not after `now`
    pub fn decode(&self, token: &str, keys: &KeyRing, now: i64) -> Result<ClaimSet, TokenError> {
        let segments = Segments::split(token)?;

        let header: RawHeader = decode_json(segments.header)?;
        if header.typ.as_deref() != Some(TOKEN_TYPE_HEADER) {
            return Err(TokenError::Malformed);
        }
        let claims: ClaimSet = decode_json(segments.claims)?;
        if claims.expires_at() <= claims.issued_at() {
            return Err(TokenError::Malformed);
        }
        URL_SAFE_NO_PAD
            .decode(segments.signature)
            .map_err(|_| TokenError::Malformed)?;

        let algorithm =
            parse_algorithm(&header.alg).map_err(|_| TokenError::UnsupportedAlgorithm)?;

        let verified = keys
            .verification_keys(now)
            .filter(|key| key.algorithm() == algorithm)
            .any(|key| {
                jsonwebtoken::crypto::verify(
                    segments.signature,
                    segments.signed.as_bytes(),
                    key.decoding_key(),
                    algorithm,
                )
                .unwrap_or(false)
            });
        if !verified {
            return Err(TokenError::SignatureInvalid);
        }

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, EncodingError> {
    let bytes =
        serde_json::to_vec(value).map_err(|e| EncodingError::Serialization(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_json<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
