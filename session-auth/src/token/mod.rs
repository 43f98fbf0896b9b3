pub mod claims;
pub mod codec;
pub mod errors;
pub mod issuer;
pub mod keys;

pub use claims::ClaimSet;
pub use claims::ClaimValue;
pub use claims::TokenType;
pub use codec::Token;
pub use codec::TokenCodec;
pub use errors::EncodingError;
pub use errors::KeyError;
pub use errors::RefreshError;
pub use errors::TokenError;
pub use issuer::TokenIssuer;
pub use keys::KeyRing;
pub use keys::KeyStore;
pub use keys::SigningKey;
