//! CV ingest: deduplicated upload, async LLM extraction, graph writing
//!
//! Uploads are deduplicated by the SHA-256 of the extracted text. New
//! resumes get a pending job on a bounded queue; a long-lived worker
//! extracts entities via the LLM and writes them into the graph, then
//! enqueues embedding work for the new nodes.

mod extractor;
mod pipeline;
mod worker;

pub use extractor::{
    CvExtraction, CvExtractor, ExtractedCandidate, ExtractedCompany, ExtractedEducation,
    ExtractedSkill,
};
pub use pipeline::{IngestPipeline, UploadOutcome};
pub use worker::{IngestJob, IngestWorker, INGEST_QUEUE_CAPACITY};

use crate::error::{Error, Result};

/// Resume byte extraction collaborator (PDF/DOCX/TXT -> plain text).
///
/// The core only consumes this interface; rich format support plugs in at
/// the boundary.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String>;
}

/// Extractor for plain-text resumes; decodes bytes as UTF-8 lossily.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8TextExtractor;

impl TextExtractor for Utf8TextExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "no text could be extracted from {filename}"
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_extraction() {
        let extractor = Utf8TextExtractor;
        let text = extractor.extract("resume.txt", b"hello world").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let extractor = Utf8TextExtractor;
        assert!(extractor.extract("resume.txt", b"   ").is_err());
    }

    #[test]
    fn test_invalid_utf8_decoded_lossily() {
        let extractor = Utf8TextExtractor;
        let text = extractor.extract("resume.txt", &[0x68, 0x69, 0xFF]).unwrap();
        assert!(text.starts_with("hi"));
    }
}
