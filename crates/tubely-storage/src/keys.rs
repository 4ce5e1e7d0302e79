//! Storage key planning.
//!
//! Key format: `{classification}/{base64url-no-pad(16 random bytes)}.{subtype}`.

use base64::Engine;
use rand::RngCore;
use tubely_core::models::Classification;

/// Random bytes behind the id segment (128 bits)
const KEY_ID_BYTES: usize = 16;

/// Length of the encoded id segment
pub const KEY_ID_LEN: usize = 22;

/// Extension used when the content type has no usable subtype
const FALLBACK_EXTENSION: &str = "bin";

/// Derive a fresh storage key for an upload.
///
/// The id segment comes from the thread-local CSPRNG (seeded from the OS), so two calls
/// never share a key in practice. The extension is the media subtype of `content_type`
/// with parameters stripped (`video/mp4; codecs=avc1` gives `mp4`).
pub fn plan_key(classification: Classification, content_type: &str) -> String {
    let mut id = [0u8; KEY_ID_BYTES];
    rand::rng().fill_bytes(&mut id);
    let id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(id);

    format!("{}/{}.{}", classification, id, extension_for(content_type))
}

fn extension_for(content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let subtype = essence
        .split_once('/')
        .map(|(_, subtype)| subtype.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        subtype
    } else {
        FALLBACK_EXTENSION.to_string()
    }
}
