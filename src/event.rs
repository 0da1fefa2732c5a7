//! Trigger event payload and object-name derivations.
//!
//! The pipeline is driven by a Cloud Storage *object finalize* event. Only
//! two fields of that payload matter — `bucket` and `name` — so the event
//! type deserializes just those and ignores the rest of the notification.
//!
//! All name derivations (`.pdf` relevance check, OCR output prefix, `.mp3`
//! output name) live here so the three pipeline stages agree on them.

use serde::Deserialize;

/// The storage notification that starts one pipeline invocation.
///
/// Matches the GCS object-finalize JSON payload; unknown fields
/// (generation, size, content type, …) are ignored on deserialize.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ObjectFinalizeEvent {
    /// Bucket the object was created in.
    pub bucket: String,
    /// Full object name within the bucket (may contain `/`).
    pub name: String,
}

impl ObjectFinalizeEvent {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Whether this event is relevant to the pipeline.
    ///
    /// An explicit capability predicate rather than ad-hoc suffix matching
    /// at the call site: the pipeline narrates PDF documents, identified by
    /// a case-insensitive `.pdf` extension.
    pub fn is_pdf(&self) -> bool {
        has_pdf_extension(&self.name)
    }

    /// Reference to the object this event describes.
    pub fn object_ref(&self) -> StorageObjectRef {
        StorageObjectRef {
            bucket: self.bucket.clone(),
            object: self.name.clone(),
        }
    }
}

/// A `{bucket, object}` pair identifying one file in Cloud Storage.
///
/// Immutable once resolved; the trigger handler retries resolution because
/// the object may not yet be visible when the create event is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObjectRef {
    pub bucket: String,
    pub object: String,
}

impl StorageObjectRef {
    /// `gs://bucket/object` form, as consumed by the Vision API.
    pub fn gs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.object)
    }
}

/// Case-insensitive `.pdf` extension check.
///
/// The boundary guard matters: object names are arbitrary UTF-8, and
/// slicing four bytes off a name ending in a multi-byte character would
/// panic.
pub fn has_pdf_extension(name: &str) -> bool {
    match name.len().checked_sub(4) {
        Some(split) if split > 0 && name.is_char_boundary(split) => {
            name[split..].eq_ignore_ascii_case(".pdf")
        }
        _ => false,
    }
}

/// Object name with the trailing `.pdf` removed, e.g. `docs/report.pdf` →
/// `docs/report`. Used as the stem for both the OCR output prefix and the
/// audio object name.
///
/// The extension is stripped case-insensitively, matching the relevance
/// check in [`has_pdf_extension`]. A literal `".pdf"` replace here would
/// leave an upload named `report.PDF` unrenamed even though it passed
/// the filter (and would collide its OCR output prefix with the source
/// name); see DESIGN.md.
pub fn pdf_stem(name: &str) -> &str {
    if has_pdf_extension(name) {
        &name[..name.len() - 4]
    } else {
        name
    }
}

/// Derived output object name: the source name with `.pdf` replaced by
/// `.mp3`. Always co-located in the source bucket.
pub fn audio_object_name(source_name: &str) -> String {
    format!("{}.mp3", pdf_stem(source_name))
}

/// Object-name prefix the OCR job writes its output shards under:
/// `{stem}.` — shards then append `output-{M}-to-{N}.json`.
pub fn ocr_output_prefix(source_name: &str) -> String {
    format!("{}.", pdf_stem(source_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension("doc1.pdf"));
        assert!(has_pdf_extension("report.PDF"));
        assert!(has_pdf_extension("weird.PdF"));
        assert!(!has_pdf_extension("image.tiff"));
        assert!(!has_pdf_extension("archive.pdf.gz"));
        assert!(!has_pdf_extension(".pdf")); // no basename
        assert!(!has_pdf_extension(""));
    }

    #[test]
    fn pdf_extension_check_survives_multibyte_names() {
        // Slicing len-4 into "café" would split the 'é' without the
        // boundary guard.
        assert!(!has_pdf_extension("café"));
        assert!(has_pdf_extension("café.pdf"));
        assert_eq!(audio_object_name("café.pdf"), "café.mp3");
    }

    #[test]
    fn audio_name_replaces_extension() {
        assert_eq!(audio_object_name("doc1.pdf"), "doc1.mp3");
        assert_eq!(audio_object_name("a/b/doc1.pdf"), "a/b/doc1.mp3");
    }

    #[test]
    fn audio_name_handles_uppercase_extension() {
        // A literal ".pdf" replace would leave "report.PDF" unrenamed
        // even though it passes the relevance check.
        assert_eq!(audio_object_name("report.PDF"), "report.mp3");
    }

    #[test]
    fn ocr_prefix_ends_with_dot() {
        assert_eq!(ocr_output_prefix("doc1.pdf"), "doc1.");
        assert_eq!(ocr_output_prefix("a/b/doc1.PDF"), "a/b/doc1.");
    }

    #[test]
    fn event_deserializes_ignoring_extra_fields() {
        let json = r#"{
            "bucket": "b1",
            "name": "doc1.pdf",
            "contentType": "application/pdf",
            "size": "12345",
            "timeCreated": "2020-01-01T00:00:00Z"
        }"#;
        let event: ObjectFinalizeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ObjectFinalizeEvent::new("b1", "doc1.pdf"));
        assert!(event.is_pdf());
    }

    #[test]
    fn gs_uri_form() {
        let r = StorageObjectRef {
            bucket: "b1".into(),
            object: "a/doc1.pdf".into(),
        };
        assert_eq!(r.gs_uri(), "gs://b1/a/doc1.pdf");
    }
}
