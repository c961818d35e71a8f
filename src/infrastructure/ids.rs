use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::domain::errors::DomainError;

pub const PRODUCT_ID_PREFIX: &str = "prod-";
pub const ORDER_ID_PREFIX: &str = "order-";

/// Attempts made before an identifier collision is reported as a fault.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// `prefix` followed by the first 8 hex digits of a random UUID.
pub fn generate_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &uuid[..8])
}

/// Runs `insert` with identifiers from `next_id`, drawing a new one whenever
/// the engine reports a unique violation.
pub fn with_fresh_id<T>(
    mut next_id: impl FnMut() -> String,
    mut insert: impl FnMut(&str) -> Result<T, DieselError>,
) -> Result<T, DomainError> {
    let mut attempt = 1;
    loop {
        let id = next_id();
        match insert(&id) {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if attempt < MAX_ID_ATTEMPTS =>
            {
                log::warn!(
                    "identifier {} already taken (attempt {}/{}): {}",
                    id,
                    attempt,
                    MAX_ID_ATTEMPTS,
                    info.message()
                );
                attempt += 1;
            }
            other => return other.map_err(DomainError::from),
        }
    }
}
