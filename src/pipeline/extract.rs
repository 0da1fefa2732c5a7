//! Document-to-text extraction via asynchronous OCR.
//!
//! Vision's batch annotate is a long-running job that writes its results
//! to Cloud Storage as JSON shards of up to `batch_size` pages each,
//! named `{stem}.output-{M}-to-{N}.json` where `M`/`N` are 1-based page
//! numbers. Reading back a single hardcoded shard name only works for
//! documents that fit one batch; this stage lists every shard under the
//! prefix, orders them by starting page, and concatenates their page
//! texts, so documents past 100 pages narrate completely.
//!
//! Page order inside a shard is taken exactly as the shard presents it —
//! Vision emits pages in physical order and this stage never re-sorts
//! them.

use crate::config::PipelineConfig;
use crate::error::Pdf2AudioError;
use crate::event::StorageObjectRef;
use crate::gcp::storage::ObjectStore;
use crate::gcp::vision::{AnnotateFileResponse, DocumentOcr, OcrJobSpec, OcrPollState};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Shard naming convention of the batch annotate output.
static SHARD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"output-(\d+)-to-(\d+)\.json$").expect("static regex"));

/// Run OCR on the source PDF and return one text string per page, in
/// physical page order.
pub async fn extract_pages(
    storage: &Arc<dyn ObjectStore>,
    ocr: &Arc<dyn DocumentOcr>,
    config: &PipelineConfig,
    source: &StorageObjectRef,
) -> Result<Vec<String>, Pdf2AudioError> {
    let job = OcrJobSpec::for_source(source, config);
    info!("Starting OCR for {}", source.gs_uri());

    let operation = ocr.submit(&job).await?;
    await_operation(ocr, config, &operation).await?;
    info!("OCR operation '{}' complete", operation);

    let pages = collect_shard_pages(storage, &job).await?;
    info!("Extracted {} pages from {}", pages.len(), source.gs_uri());
    Ok(pages)
}

/// Poll the operation until done, bounded by `config.ocr_timeout`.
async fn await_operation(
    ocr: &Arc<dyn DocumentOcr>,
    config: &PipelineConfig,
    operation: &str,
) -> Result<(), Pdf2AudioError> {
    let deadline = Instant::now() + config.ocr_timeout;
    loop {
        match ocr.poll(operation).await? {
            OcrPollState::Done => return Ok(()),
            OcrPollState::Running => {}
        }
        if Instant::now() >= deadline {
            return Err(Pdf2AudioError::OcrTimeout {
                operation: operation.to_string(),
                secs: config.ocr_timeout.as_secs(),
            });
        }
        debug!("OCR operation '{}' still running", operation);
        sleep(config.ocr_poll_interval).await;
    }
}

/// List, order, download, and parse every output shard; concatenate their
/// page texts.
async fn collect_shard_pages(
    storage: &Arc<dyn ObjectStore>,
    job: &OcrJobSpec,
) -> Result<Vec<String>, Pdf2AudioError> {
    // `{stem}.output-` keeps the source PDF (and any later MP3) out of
    // the listing; the regex below still gates what counts as a shard.
    let list_prefix = format!("{}output-", job.output_object_prefix());
    let listed = storage
        .list_objects(&job.source.bucket, &list_prefix)
        .await?;

    let mut shards: Vec<(u64, String)> = listed
        .into_iter()
        .filter_map(|name| shard_start_page(&name).map(|start| (start, name)))
        .collect();
    if shards.is_empty() {
        return Err(Pdf2AudioError::MissingOcrOutput {
            bucket: job.source.bucket.clone(),
            prefix: list_prefix,
        });
    }
    shards.sort_by_key(|(start, _)| *start);
    debug!("Found {} OCR output shard(s)", shards.len());

    let mut pages = Vec::new();
    for (_, shard_name) in &shards {
        let bytes = storage.download(&job.source.bucket, shard_name).await?;
        let parsed: AnnotateFileResponse =
            serde_json::from_slice(&bytes).map_err(|e| Pdf2AudioError::MalformedOcrOutput {
                bucket: job.source.bucket.clone(),
                object: shard_name.clone(),
                detail: e.to_string(),
            })?;

        for page in parsed.responses {
            // A page with no detected text (blank page) still occupies a
            // slot so page count stays truthful.
            let text = page.full_text_annotation.map(|a| a.text).unwrap_or_default();
            if let Some(n) = page.context.and_then(|c| c.page_number) {
                debug!("Collected page {} from shard '{}'", n, shard_name);
            }
            pages.push(text);
        }
    }
    Ok(pages)
}

/// Starting page number of a shard, or `None` if the name is not a shard.
fn shard_start_page(name: &str) -> Option<u64> {
    SHARD_NAME
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_start_page_parses_convention() {
        assert_eq!(shard_start_page("doc1.output-1-to-2.json"), Some(1));
        assert_eq!(shard_start_page("a/b/doc.output-101-to-200.json"), Some(101));
        assert_eq!(shard_start_page("doc1.pdf"), None);
        assert_eq!(shard_start_page("doc1.output-x-to-2.json"), None);
        assert_eq!(shard_start_page("doc1.output-1-to-2.json.bak"), None);
    }

    #[test]
    fn shards_sort_numerically_not_lexicographically() {
        let mut shards: Vec<(u64, String)> = [
            "doc.output-101-to-102.json",
            "doc.output-1-to-100.json",
            "doc.output-11-to-20.json",
        ]
        .iter()
        .filter_map(|n| shard_start_page(n).map(|s| (s, n.to_string())))
        .collect();
        shards.sort_by_key(|(start, _)| *start);
        let order: Vec<u64> = shards.iter().map(|(s, _)| *s).collect();
        // Lexicographic order would put 101 before 11.
        assert_eq!(order, vec![1, 11, 101]);
    }
}
