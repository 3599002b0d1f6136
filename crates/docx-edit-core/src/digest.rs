use sha2::{Digest, Sha256};

use crate::model::Document;

/// SHA-256 of the document's JSON snapshot, hex encoded.
pub fn fingerprint(document: &Document) -> Result<String, serde_json::Error> {
    let snapshot = serde_json::to_vec(document)?;
    let mut hasher = Sha256::new();
    hasher.update(&snapshot);
    Ok(hex::encode(hasher.finalize()))
}
