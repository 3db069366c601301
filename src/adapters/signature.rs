use {
    crate::domain::error::BillingError,
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Verify a Creem webhook: HMAC-SHA256 over the raw body, hex-encoded in
/// the signature header, optionally prefixed with `sha256=`. Any failure
/// rejects the whole request before parsing — this is a security
/// boundary, not a recoverable condition.
pub fn verify(raw_body: &str, signature_header: &str, secret: &str) -> Result<(), BillingError> {
    if raw_body.is_empty() {
        return Err(BillingError::Signature("empty body".into()));
    }
    if signature_header.is_empty() {
        return Err(BillingError::Signature("empty signature header".into()));
    }

    let supplied = signature_header
        .strip_prefix("sha256=")
        .unwrap_or(signature_header);
    let supplied = hex::decode(supplied)
        .map_err(|_| BillingError::Signature("signature is not valid hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::Signature("invalid webhook secret".into()))?;
    mac.update(raw_body.as_bytes());

    // verify_slice is constant-time.
    mac.verify_slice(&supplied)
        .map_err(|_| BillingError::Signature("signature mismatch".into()))
}
