//! AWS Signature Version 4 request signing, the authentication scheme
//! every S3-compatible endpoint this backend talks to expects.
//!
//! Grounded on `unftp-sbe-gcs`'s `TokenSource` (auth material computed
//! fresh per request and injected as headers by the request envelope,
//! rather than baked into a shared client) — generalized here from OAuth2
//! bearer tokens to SigV4's per-request canonical-request signature.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Static credentials for one S3-compatible account.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// AWS-style access key id.
    pub access_key_id: String,
    /// AWS-style secret access key.
    pub secret_access_key: String,
    /// The region the endpoint is configured for (`"us-east-1"` for most
    /// non-AWS S3-compatible stores, which ignore the value but still
    /// require it to be present in the signed string).
    pub region: String,
}

/// Produces the `Authorization`, `x-amz-date` and `x-amz-content-sha256`
/// headers for one request, per the AWS SigV4 canonical-request algorithm.
pub fn sign(
    credentials: &Credentials,
    method: &str,
    host: &str,
    canonical_uri: &str,
    query: &BTreeMap<String, String>,
    extra_headers: &BTreeMap<String, String>,
    payload: &[u8],
    now: DateTime<Utc>,
) -> BTreeMap<String, String> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let payload_hash = hex_sha256(payload);

    let mut headers = extra_headers.clone();
    headers.insert("host".to_string(), host.to_string());
    headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
    headers.insert("x-amz-date".to_string(), amz_date.clone());

    let canonical_query = query
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
        .collect::<Vec<_>>()
        .join("&");

    let mut signed_header_names: Vec<&str> = headers.keys().map(String::as_str).collect();
    signed_header_names.sort_unstable();
    let signed_headers = signed_header_names.join(";");

    let canonical_headers = signed_header_names
        .iter()
        .map(|name| format!("{}:{}\n", name, headers[*name].trim()))
        .collect::<String>();

    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );

    let scope = format!("{date_stamp}/{}/s3/aws4_request", credentials.region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&credentials.secret_access_key, &date_stamp, &credentials.region);
    let signature = hex_hmac(&signing_key, string_to_sign.as_bytes());

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    );

    let mut out = BTreeMap::new();
    out.insert("Authorization".to_string(), authorization);
    out.insert("x-amz-date".to_string(), amz_date);
    out.insert("x-amz-content-sha256".to_string(), payload_hash);
    out
}

fn derive_signing_key(secret: &str, date_stamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, b"s3");
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac(key: &[u8], message: &[u8]) -> String {
    hex(&hmac(key, message))
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Builds the canonical (and literal request-line) URI for `bucket`/`key`:
/// each path segment is percent-encoded individually so a literal `/`
/// within a key's display name doesn't get mistaken for a path separator,
/// while the separators themselves are preserved.
pub fn canonical_uri(bucket: &str, key: &str) -> String {
    let mut out = String::from("/");
    out.push_str(&uri_encode(bucket, true));
    out.push('/');
    out.push_str(
        &key.split('/')
            .map(|segment| uri_encode(segment, true))
            .collect::<Vec<_>>()
            .join("/"),
    );
    out
}

/// AWS's flavor of percent-encoding: everything but unreserved characters
/// is escaped, and (only for query strings) `/` is escaped too.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        let c = byte as char;
        let unreserved = c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
        if unreserved || (c == '/' && !encode_slash) {
            out.push(c);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_deterministic_for_identical_inputs() {
        let creds = Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
            region: "us-east-1".to_string(),
        };
        let now = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let a = sign(&creds, "GET", "/", "example-bucket.s3.amazonaws.com", &Default::default(), &Default::default(), b"", now);
        let b = sign(&creds, "GET", "/", "example-bucket.s3.amazonaws.com", &Default::default(), &Default::default(), b"", now);
        assert_eq!(a, b);
    }

    #[test]
    fn a_different_payload_changes_the_signature() {
        let creds = Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            region: "us-east-1".to_string(),
        };
        let now = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let a = sign(&creds, "PUT", "/key", "bucket.s3.amazonaws.com", &Default::default(), &Default::default(), b"one", now);
        let b = sign(&creds, "PUT", "/key", "bucket.s3.amazonaws.com", &Default::default(), &Default::default(), b"two", now);
        assert_ne!(a["Authorization"], b["Authorization"]);
    }
}
