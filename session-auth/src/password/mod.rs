pub mod argon2;
pub mod errors;
pub mod pool;
pub mod stored_hash;

pub use self::argon2::PasswordHasher;
pub use self::argon2::MAX_COST_FACTOR;
pub use errors::HashingError;
pub use errors::MalformedHash;
pub use pool::HashingPool;
pub use stored_hash::HashCost;
pub use stored_hash::StoredHash;
