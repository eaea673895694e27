//! Credential model for storage.

use serde::{Deserialize, Serialize};

/// A user's OAuth credentials as stored in the users collection.
///
/// Every secret field holds `base64(IV || ciphertext)`; the raw user id is
/// only ever stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// SHA-256 hex of the raw user id (also used as document ID)
    pub id: String,
    /// Encrypted raw Fitbit user id
    pub encrypted_user_id: String,
    /// Encrypted access token
    pub encrypted_access_token: String,
    /// Encrypted refresh token
    pub encrypted_refresh_token: String,
    /// When the credential was first stored (RFC 3339)
    pub created_at: String,
    /// When the token pair was last replaced (RFC 3339)
    pub updated_at: String,
}

/// Plaintext view of a [`CredentialRecord`].
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedCredential {
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
}

// Keep tokens out of logs.
impl std::fmt::Debug for DecodedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedCredential")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
