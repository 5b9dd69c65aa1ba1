//! Upload admission checks
//!
//! Run synchronously before any job is created. Returns the full list of
//! rejection reasons; an empty list means the document is admitted. The
//! conversion core never sees a document that failed admission.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::pdf::PdfFile;

/// Validate an uploaded PDF against the admission ceilings
pub fn validate(path: &Path, limits: &LimitsConfig) -> Vec<String> {
    let mut errors = Vec::new();

    match std::fs::metadata(path) {
        Ok(meta) => {
            let size_mb = meta.len() as f64 / (1024.0 * 1024.0);
            if size_mb > limits.max_file_size_mb as f64 {
                errors.push(format!("File size exceeds {} MB", limits.max_file_size_mb));
            }
        }
        Err(e) => {
            errors.push(format!("Failed to open PDF: {}", e));
            return errors;
        }
    }

    match PdfFile::open(path) {
        Ok(file) => {
            if file.page_count() > limits.max_page_count {
                errors.push(format!(
                    "PDF has more than {} pages",
                    limits.max_page_count
                ));
            }
            match file.has_text_layer() {
                Ok(true) => {}
                Ok(false) => errors.push(
                    "PDF appears to be scanned or image-based (no selectable text found)"
                        .to_string(),
                ),
                Err(e) => errors.push(format!("Failed to open PDF: {}", e)),
            }
        }
        Err(e) => errors.push(format!("Failed to open PDF: {}", e)),
    }

    errors
}
