//! File-level metadata inference.
//!
//! Scans the first lines of a configuration for vendor banners and the
//! hostname stanza. Best-effort: absence of any signal is normal and
//! leaves the `"unknown"` defaults in place.

use crate::models::FileMetadata;

/// How many leading lines are scanned.
const SCAN_WINDOW: usize = 50;

/// Infer vendor, OS family, and hostname from the start of a file.
///
/// Scans top to bottom; a later match overwrites an earlier one. The two
/// banner needles differ only in the space before the colon, which is what
/// separates the IOS-style banner from the AOS-CX one.
pub fn detect_metadata(text: &str, filename: &str) -> FileMetadata {
    let mut meta = FileMetadata::unknown(filename);

    for line in text.lines().take(SCAN_WINDOW) {
        if line.contains("Current configuration :") {
            meta.vendor = "cisco".to_string();
            meta.os_family = "sugg_ios_xe".to_string();
        } else if line.contains("Current configuration:") {
            meta.vendor = "aruba".to_string();
            meta.os_family = "sugg_aos_cx".to_string();
        }
        if let Some(rest) = line.strip_prefix("hostname ") {
            meta.hostname = rest.trim().to_string();
        }
    }

    meta
}
