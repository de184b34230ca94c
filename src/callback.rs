//! The HMAC-signed callback channel to the owning web application
//! (specification §6, "Callback channel").
//!
//! Delivered as a signed HTTP PUT on create/update/delete/move/copy. The
//! transport (actually issuing the PUT) is the embedding application's job —
//! out of scope per §1 ("the callback-logging side channel ... is an
//! external collaborator") — this module only builds and signs the
//! `{payload, signature}` envelope.

use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use serde_json::{json, Value};

use crate::error::{Error, ErrorKind, Result};
use crate::settings::Settings;

/// The action that triggered a callback, mirrored into the callback body's
/// `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// A new entity was created (upload, create-folder).
    Create,
    /// An existing entity's content was replaced.
    Update,
    /// An entity was deleted.
    Delete,
    /// An entity was moved, possibly across providers.
    Move,
    /// An entity was copied, possibly across providers.
    Copy,
}

impl CallbackAction {
    fn as_str(self) -> &'static str {
        match self {
            CallbackAction::Create => "create",
            CallbackAction::Update => "update",
            CallbackAction::Delete => "delete",
            CallbackAction::Move => "move",
            CallbackAction::Copy => "copy",
        }
    }
}

/// The HMAC algorithm used to sign callback payloads (specification §6,
/// "HMAC secret and algorithm").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum HmacAlgorithm {
    /// HMAC-SHA256 (the default).
    #[default]
    Sha256,
    /// HMAC-SHA512, for deployments that want a wider digest.
    Sha512,
}

/// Builds and signs callback payloads delivered to the owning web
/// application.
///
/// Mirrors `waterbutler.core.signing.Signer`: the payload is the base64
/// encoding of the JSON body, and the signature HMACs that base64 string
/// (not the raw JSON) so the receiver can verify without re-serializing.
pub struct CallbackSigner {
    secret: String,
    algorithm: HmacAlgorithm,
}

impl CallbackSigner {
    /// Builds a signer from gateway-wide settings. Returns `None` when no
    /// secret is configured, meaning callbacks are disabled for this
    /// deployment.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        settings.callback_hmac_secret.clone().map(|secret| CallbackSigner {
            secret,
            algorithm: settings.callback_hmac_algorithm,
        })
    }

    /// Builds a signer directly from a secret and algorithm, bypassing
    /// [`Settings`] (useful in tests).
    pub fn new(secret: impl Into<String>, algorithm: HmacAlgorithm) -> Self {
        CallbackSigner {
            secret: secret.into(),
            algorithm,
        }
    }

    /// Builds the `{action, metadata, auth, provider, time}` body for a
    /// single-entity action (create/update/delete) and signs it.
    pub fn sign_entity(&self, action: CallbackAction, provider: &str, auth: &Value, metadata: &Value, time: &str) -> Result<Value> {
        let body = json!({
            "action": action.as_str(),
            "metadata": metadata,
            "auth": auth,
            "provider": provider,
            "time": time,
        });
        self.sign(&body)
    }

    /// As [`CallbackSigner::sign_entity`], but for move/copy actions whose
    /// body carries `source`/`destination` instead of a single `metadata`
    /// field.
    pub fn sign_transfer(
        &self,
        action: CallbackAction,
        provider: &str,
        auth: &Value,
        source: &Value,
        destination: &Value,
        time: &str,
    ) -> Result<Value> {
        let body = json!({
            "action": action.as_str(),
            "source": source,
            "destination": destination,
            "auth": auth,
            "provider": provider,
            "time": time,
        });
        self.sign(&body)
    }

    /// Encodes `body` as base64 and HMACs the base64 string, returning the
    /// `{payload, signature}` envelope ready to PUT to the callback URL.
    fn sign(&self, body: &Value) -> Result<Value> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let serialized = serde_json::to_vec(body)
            .map_err(|e| Error::new(ErrorKind::InvalidParameters, "callback body failed to serialize").with_source(e))?;
        let payload = STANDARD.encode(serialized);
        let signature = match self.algorithm {
            HmacAlgorithm::Sha256 => self.hmac_hex::<hmac::Hmac<sha2::Sha256>>(payload.as_bytes()),
            HmacAlgorithm::Sha512 => self.hmac_hex::<hmac::Hmac<sha2::Sha512>>(payload.as_bytes()),
        };
        Ok(json!({ "payload": payload, "signature": signature }))
    }

    fn hmac_hex<M: Mac>(&self, message: &[u8]) -> String {
        let mut mac = M::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts a key of any length");
        mac.update(message);
        hex_encode(&mac.finalize().into_bytes())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String never fails");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_deterministic_for_the_same_body_and_secret() {
        let signer = CallbackSigner::new("sekrit", HmacAlgorithm::Sha256);
        let auth = json!({"id": "user-1"});
        let metadata = json!({"path": "/foo.txt"});
        let a = signer.sign_entity(CallbackAction::Create, "s3", &auth, &metadata, "2026-01-01T00:00:00Z").unwrap();
        let b = signer.sign_entity(CallbackAction::Create, "s3", &auth, &metadata, "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn a_different_secret_produces_a_different_signature() {
        let auth = json!({"id": "user-1"});
        let metadata = json!({"path": "/foo.txt"});
        let a = CallbackSigner::new("sekrit-one", HmacAlgorithm::Sha256)
            .sign_entity(CallbackAction::Update, "s3", &auth, &metadata, "2026-01-01T00:00:00Z")
            .unwrap();
        let b = CallbackSigner::new("sekrit-two", HmacAlgorithm::Sha256)
            .sign_entity(CallbackAction::Update, "s3", &auth, &metadata, "2026-01-01T00:00:00Z")
            .unwrap();
        assert_ne!(a["signature"], b["signature"]);
    }

    #[test]
    fn transfer_callbacks_carry_source_and_destination_not_metadata() {
        let signer = CallbackSigner::new("sekrit", HmacAlgorithm::Sha256);
        let auth = json!({});
        let source = json!({"path": "/a.txt"});
        let dest = json!({"path": "/b.txt"});
        let envelope = signer
            .sign_transfer(CallbackAction::Move, "s3", &auth, &source, &dest, "2026-01-01T00:00:00Z")
            .unwrap();
        assert!(envelope.get("payload").is_some());
        assert!(envelope.get("signature").is_some());
    }

    #[test]
    fn from_settings_is_none_without_a_configured_secret() {
        let settings = Settings::default();
        assert!(CallbackSigner::from_settings(&settings).is_none());
    }
}
