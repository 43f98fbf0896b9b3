pub mod bearer;
pub mod errors;
pub mod models;
pub mod ports;
pub mod service;

pub use bearer::parse_bearer;
pub use errors::AuthError;
pub use models::AuthResult;
pub use models::Credential;
pub use models::Principal;
pub use models::RejectReason;
pub use models::TokenPair;
pub use models::TokenResponse;
pub use ports::CredentialStore;
pub use ports::LookupError;
pub use service::AuthenticationService;
