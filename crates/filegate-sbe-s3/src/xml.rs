//! The XML wire shapes S3-compatible endpoints use for bucket listing and
//! the multipart-upload lifecycle (specification §7, "Chunked upload").
//! Parsed/built with `quick-xml`'s serde integration rather than
//! hand-rolled string formatting, mirroring how `unftp-sbe-gcs` leans on
//! `serde_json`/`Deserialize` for its JSON wire types instead of
//! hand-parsing.

use serde::{Deserialize, Serialize};

/// `InitiateMultipartUploadResult`, the response to `POST ?uploads`.
#[derive(Debug, Deserialize)]
#[serde(rename = "InitiateMultipartUploadResult")]
pub struct InitiateMultipartUploadResult {
    /// The backend-assigned upload session id.
    #[serde(rename = "UploadId")]
    pub upload_id: String,
}

/// One `<Part>` entry in a `CompleteMultipartUpload` request body.
#[derive(Debug, Serialize)]
pub struct CompletePart {
    /// 1-indexed part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// The ETag the backend returned when this part was uploaded.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// The `CompleteMultipartUpload` request body: an ordered list of parts.
#[derive(Debug, Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUpload {
    /// Parts, already in ascending part-number order.
    #[serde(rename = "Part")]
    pub parts: Vec<CompletePart>,
}

/// `CompleteMultipartUploadResult`, the response to the completion POST.
#[derive(Debug, Deserialize)]
#[serde(rename = "CompleteMultipartUploadResult")]
pub struct CompleteMultipartUploadResult {
    /// The final object's ETag.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// One `<Part>` entry in a `ListPartsResult` response.
#[derive(Debug, Deserialize, Clone)]
pub struct ListedPart {
    /// 1-indexed part number.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// The part's ETag.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// `ListPartsResult`, the response to `GET ?uploadId=...` used to confirm
/// an abort actually freed every part.
#[derive(Debug, Deserialize, Default)]
#[serde(rename = "ListPartsResult", default)]
pub struct ListPartsResult {
    /// Parts the backend still has recorded for this session.
    #[serde(rename = "Part")]
    pub parts: Vec<ListedPart>,
}

/// One `<Contents>` entry of a bucket listing.
#[derive(Debug, Deserialize, Clone)]
pub struct ListedObject {
    /// The object's full key.
    #[serde(rename = "Key")]
    pub key: String,
    /// Size in bytes.
    #[serde(rename = "Size")]
    pub size: u64,
    /// The object's raw ETag, quoted as the backend reports it.
    #[serde(rename = "ETag")]
    pub etag: String,
    /// Last-modified timestamp, RFC 3339.
    #[serde(rename = "LastModified")]
    pub last_modified: Option<String>,
}

/// One `<CommonPrefixes>` entry — a synthetic "subfolder" surfaced by
/// `delimiter=/` listing.
#[derive(Debug, Deserialize, Clone)]
pub struct CommonPrefix {
    /// The prefix, including its trailing `/`.
    #[serde(rename = "Prefix")]
    pub prefix: String,
}

/// `ListBucketResult`, the response to a `GET /?prefix=...&delimiter=/`
/// bucket listing.
#[derive(Debug, Deserialize, Default)]
#[serde(rename = "ListBucketResult", default)]
pub struct ListBucketResult {
    /// Objects directly under the requested prefix.
    #[serde(rename = "Contents")]
    pub contents: Vec<ListedObject>,
    /// Synthetic subfolders one level under the requested prefix.
    #[serde(rename = "CommonPrefixes")]
    pub common_prefixes: Vec<CommonPrefix>,
    /// Whether the listing was truncated and needs a follow-up request.
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    /// Opaque continuation token for the next page, when truncated.
    #[serde(rename = "NextContinuationToken")]
    pub next_continuation_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_an_initiate_multipart_upload_result() {
        let xml = r#"<InitiateMultipartUploadResult><Bucket>b</Bucket><Key>k</Key><UploadId>abc-123</UploadId></InitiateMultipartUploadResult>"#;
        let parsed: InitiateMultipartUploadResult = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(parsed.upload_id, "abc-123");
    }

    #[test]
    fn serializes_complete_multipart_upload_with_parts_in_order() {
        let body = CompleteMultipartUpload {
            parts: vec![
                CompletePart { part_number: 1, etag: "\"a\"".to_string() },
                CompletePart { part_number: 2, etag: "\"b\"".to_string() },
            ],
        };
        let xml = quick_xml::se::to_string(&body).unwrap();
        let first = xml.find("PartNumber>1<").unwrap();
        let second = xml.find("PartNumber>2<").unwrap();
        assert!(first < second);
    }

    #[test]
    fn parses_an_empty_list_parts_result_as_clean() {
        let xml = r#"<ListPartsResult></ListPartsResult>"#;
        let parsed: ListPartsResult = quick_xml::de::from_str(xml).unwrap();
        assert!(parsed.parts.is_empty());
    }

    #[test]
    fn parses_a_bucket_listing_with_common_prefixes() {
        let xml = r#"<ListBucketResult>
            <Contents><Key>thisfolder/item1</Key><Size>4</Size><ETag>"x"</ETag></Contents>
            <CommonPrefixes><Prefix>thisfolder/sub/</Prefix></CommonPrefixes>
        </ListBucketResult>"#;
        let parsed: ListBucketResult = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(parsed.contents.len(), 1);
        assert_eq!(parsed.common_prefixes[0].prefix, "thisfolder/sub/");
    }
}
