use sha2::{Digest, Sha256};

/// Hex characters kept from the digest for holding ids.
const ID_HEX_LEN: usize = 16;

/// Compute SHA-256 hash of a byte slice.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Deterministic holding id from the owning account and ISIN.
///
/// `occurrence` disambiguates the same ISIN listed more than once in one
/// account (free and pledged balances, for example); the first listing
/// uses 0.
#[must_use]
pub fn holding_id(
    depository: &str,
    participant_id: &str,
    client_id: &str,
    security_id: &str,
    occurrence: usize,
) -> String {
    let mut key = format!("{depository}|{participant_id}|{client_id}|{security_id}");
    if occurrence > 0 {
        key.push_str(&format!("#{occurrence}"));
    }
    let digest = hash_bytes(key.as_bytes());
    format!("h_{}", &digest[..ID_HEX_LEN])
}
