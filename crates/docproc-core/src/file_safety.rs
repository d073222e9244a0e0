//! Upload safety checks: filename sanitization, storage path containment, and
//! the ordered upload validator.
//!
//! Multi-layer protection:
//! 1. Validator gates extension, declared type, size, emptiness, and magic bytes
//! 2. Sanitizer reduces the client filename to a constrained charset plus a
//!    random prefix
//! 3. Path guard re-checks the final path against the canonical storage root
//!
//! All three run before a single byte is written.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::defaults::{
    ALLOWED_EXTENSIONS, FILENAME_PREFIX_LEN, PDF_CONTENT_TYPE, PDF_SIGNATURE,
};
use crate::error::UploadRejection;

/// Anything that is not a word character, dot, or hyphen.
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w.\-]").expect("static regex"));

/// Sanitize an untrusted filename into a safe, collision-resistant storage name.
///
/// Keeps only the last path segment, drops null bytes, replaces characters
/// outside `[\w.-]` with `_`, and prepends an 8-hex-character random prefix.
pub fn sanitize_filename(filename: &str) -> Result<String, UploadRejection> {
    if filename.is_empty() {
        return Err(UploadRejection::InvalidFilename(
            "Filename cannot be empty".to_string(),
        ));
    }

    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let name = name.replace('\0', "");
    let safe = UNSAFE_FILENAME_CHARS.replace_all(&name, "_");

    if safe.is_empty() || safe == "." || safe == ".." {
        return Err(UploadRejection::InvalidFilename(
            "Invalid filename after sanitization".to_string(),
        ));
    }

    Ok(format!("{}_{}", random_prefix(), safe))
}

fn random_prefix() -> String {
    let value: u32 = rand::thread_rng().gen();
    format!("{:0width$x}", value, width = FILENAME_PREFIX_LEN)
}

/// Check that `candidate` resolves strictly inside `root`.
///
/// Both paths are canonicalized (symlinks, `.` and `..` resolved). A candidate
/// that does not exist yet is resolved through its parent directory. Anything
/// that cannot be resolved is treated as outside the root.
pub fn is_within_root(root: &Path, candidate: &Path) -> bool {
    let Ok(root) = root.canonicalize() else {
        return false;
    };
    let Some(resolved) = resolve_candidate(candidate) else {
        return false;
    };
    resolved != root && resolved.starts_with(&root)
}

fn resolve_candidate(candidate: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = candidate.canonicalize() {
        return Some(resolved);
    }
    // Something exists but cannot be resolved: a dangling symlink.
    if candidate.symlink_metadata().is_ok() {
        return None;
    }
    // file_name() is None for paths ending in `..`
    let name = candidate.file_name()?;
    let parent = candidate.parent()?;
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    Some(parent.canonicalize().ok()?.join(name))
}

/// Validate an upload before any byte is persisted.
///
/// Checks run in a fixed order and stop at the first failure:
/// filename present, extension allowed, declared content type, size ceiling,
/// non-empty payload, `%PDF` signature.
pub fn validate_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
    max_size_bytes: u64,
) -> Result<(), UploadRejection> {
    let filename = match filename {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(UploadRejection::MissingFilename),
    };

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadRejection::UnsupportedExtension(extension));
    }

    let content_type = content_type.unwrap_or_default();
    if content_type != PDF_CONTENT_TYPE {
        return Err(UploadRejection::UnsupportedContentType(
            content_type.to_string(),
        ));
    }

    let size = data.len() as u64;
    if size > max_size_bytes {
        return Err(UploadRejection::FileTooLarge {
            max: max_size_bytes,
            actual: size,
        });
    }

    if data.is_empty() {
        return Err(UploadRejection::EmptyFile);
    }

    if !has_pdf_signature(data) {
        return Err(UploadRejection::InvalidSignature {
            detected: infer::get(data).map(|kind| kind.mime_type().to_string()),
        });
    }

    Ok(())
}

/// True if the payload starts with the PDF magic bytes.
pub fn has_pdf_signature(data: &[u8]) -> bool {
    data.len() >= PDF_SIGNATURE.len() && &data[..PDF_SIGNATURE.len()] == PDF_SIGNATURE
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u64 = 1024;

    fn sanitized_pattern() -> Regex {
        Regex::new(r"^[0-9a-f]{8}_[\w.\-]+$").unwrap()
    }

    #[test]
    fn test_sanitize_removes_path() {
        let name = sanitize_filename("/etc/passwd").unwrap();
        assert!(name.ends_with("_passwd"));
        let name = sanitize_filename("C:\\Windows\\system32.dll").unwrap();
        assert!(name.ends_with("_system32.dll"));
    }

    #[test]
    fn test_sanitize_traversal_keeps_last_segment() {
        let name = sanitize_filename("../../etc/shadow.pdf").unwrap();
        assert!(name.ends_with("_shadow.pdf"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_sanitize_replaces_unsafe_chars() {
        let name = sanitize_filename("my report (final)!.pdf").unwrap();
        assert_eq!(&name[9..], "my_report__final__.pdf");
    }

    #[test]
    fn test_sanitize_keeps_unicode_word_chars() {
        let name = sanitize_filename("relatório café.pdf").unwrap();
        assert_eq!(&name[9..], "relatório_café.pdf");
    }

    #[test]
    fn test_sanitize_strips_null_bytes() {
        let name = sanitize_filename("evil\0.pdf").unwrap();
        assert_eq!(&name[9..], "evil.pdf");
    }

    #[test]
    fn test_sanitize_rejects_empty_and_dots() {
        assert!(matches!(
            sanitize_filename(""),
            Err(UploadRejection::InvalidFilename(_))
        ));
        assert!(matches!(
            sanitize_filename("."),
            Err(UploadRejection::InvalidFilename(_))
        ));
        assert!(matches!(
            sanitize_filename(".."),
            Err(UploadRejection::InvalidFilename(_))
        ));
        assert!(matches!(
            sanitize_filename("dir/"),
            Err(UploadRejection::InvalidFilename(_))
        ));
        assert!(matches!(
            sanitize_filename("\0"),
            Err(UploadRejection::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_sanitize_output_shape() {
        let pattern = sanitized_pattern();
        let inputs = [
            "report.pdf",
            "../../../etc/passwd",
            "/absolute/path/doc.pdf",
            "..\\..\\windows\\win.ini",
            "spaces and $ymbols.pdf",
            "ünïcödé.pdf",
            "...",
            "a",
        ];
        for input in inputs {
            let name = sanitize_filename(input).unwrap();
            assert!(pattern.is_match(&name), "{:?} -> {:?}", input, name);
            assert_ne!(name, ".");
            assert_ne!(name, "..");
        }
    }

    #[test]
    fn test_sanitize_prefix_is_unique_per_call() {
        let a = sanitize_filename("same.pdf").unwrap();
        let b = sanitize_filename("same.pdf").unwrap();
        let c = sanitize_filename("same.pdf").unwrap();
        // Three identical collisions in a 32-bit space would be a broken RNG.
        assert!(a != b || b != c);
    }

    #[test]
    fn test_sanitized_traversal_inputs_pass_guard() {
        let root = tempfile::tempdir().unwrap();
        let inputs = [
            "../escape.pdf",
            "../../../../etc/passwd",
            "/etc/passwd",
            "..\\..\\boot.ini",
            "sub/../../x.pdf",
            "....//....//x.pdf",
        ];
        for input in inputs {
            let name = sanitize_filename(input).unwrap();
            let candidate = root.path().join(&name);
            assert!(
                is_within_root(root.path(), &candidate),
                "{:?} sanitized to {:?} escaped the root",
                input,
                name
            );
        }
    }

    #[test]
    fn test_guard_rejects_parent_escape() {
        let root = tempfile::tempdir().unwrap();
        let candidate = root.path().join("..").join("outside.pdf");
        assert!(!is_within_root(root.path(), &candidate));
    }

    #[test]
    fn test_guard_rejects_root_itself() {
        let root = tempfile::tempdir().unwrap();
        assert!(!is_within_root(root.path(), root.path()));
        assert!(!is_within_root(root.path(), &root.path().join(".")));
    }

    #[test]
    fn test_guard_rejects_sibling_with_shared_prefix() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("uploads");
        let sibling = base.path().join("uploads-evil");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(&sibling).unwrap();
        assert!(!is_within_root(&root, &sibling.join("x.pdf")));
    }

    #[test]
    fn test_guard_accepts_existing_file() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("present.pdf");
        std::fs::write(&file, b"%PDF").unwrap();
        assert!(is_within_root(root.path(), &file));
    }

    #[test]
    fn test_guard_rejects_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("does-not-exist");
        assert!(!is_within_root(&root, &root.join("x.pdf")));
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_rejects_symlink_out_of_root() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("target.pdf");
        std::fs::write(&target, b"%PDF").unwrap();
        let link = root.path().join("link.pdf");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert!(!is_within_root(root.path(), &link));
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_rejects_dangling_symlink() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link = root.path().join("dangling.pdf");
        std::os::unix::fs::symlink(outside.path().join("missing.pdf"), &link).unwrap();
        assert!(!is_within_root(root.path(), &link));
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_rejects_symlinked_directory() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link_dir = root.path().join("sub");
        std::os::unix::fs::symlink(outside.path(), &link_dir).unwrap();
        assert!(!is_within_root(root.path(), &link_dir.join("new.pdf")));
    }

    #[test]
    fn test_validate_accepts_pdf() {
        let result = validate_upload(
            Some("report.pdf"),
            Some("application/pdf"),
            b"%PDF-1.4 body",
            LIMIT,
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_validate_extension_is_case_insensitive() {
        let result = validate_upload(
            Some("REPORT.PDF"),
            Some("application/pdf"),
            b"%PDF-1.7",
            LIMIT,
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_validate_missing_filename() {
        let data = b"%PDF";
        assert_eq!(
            validate_upload(None, Some("application/pdf"), data, LIMIT),
            Err(UploadRejection::MissingFilename)
        );
        assert_eq!(
            validate_upload(Some("   "), Some("application/pdf"), data, LIMIT),
            Err(UploadRejection::MissingFilename)
        );
    }

    #[test]
    fn test_validate_unsupported_extension() {
        assert_eq!(
            validate_upload(Some("notes.txt"), Some("application/pdf"), b"%PDF", LIMIT),
            Err(UploadRejection::UnsupportedExtension("txt".to_string()))
        );
        assert_eq!(
            validate_upload(Some("noext"), Some("application/pdf"), b"%PDF", LIMIT),
            Err(UploadRejection::UnsupportedExtension(String::new()))
        );
        assert_eq!(
            validate_upload(Some("doc.pdf.exe"), Some("application/pdf"), b"%PDF", LIMIT),
            Err(UploadRejection::UnsupportedExtension("exe".to_string()))
        );
    }

    #[test]
    fn test_validate_unsupported_content_type() {
        assert_eq!(
            validate_upload(Some("doc.pdf"), Some("text/plain"), b"%PDF", LIMIT),
            Err(UploadRejection::UnsupportedContentType("text/plain".to_string()))
        );
        assert_eq!(
            validate_upload(Some("doc.pdf"), None, b"%PDF", LIMIT),
            Err(UploadRejection::UnsupportedContentType(String::new()))
        );
    }

    #[test]
    fn test_validate_size_boundary() {
        let at_limit = {
            let mut data = b"%PDF".to_vec();
            data.resize(LIMIT as usize, b'A');
            data
        };
        assert_eq!(
            validate_upload(Some("big.pdf"), Some("application/pdf"), &at_limit, LIMIT),
            Ok(())
        );

        let mut over = at_limit.clone();
        over.push(b'A');
        assert_eq!(
            validate_upload(Some("big.pdf"), Some("application/pdf"), &over, LIMIT),
            Err(UploadRejection::FileTooLarge {
                max: LIMIT,
                actual: LIMIT + 1
            })
        );
    }

    #[test]
    fn test_validate_size_boundary_at_default_limit() {
        use crate::defaults::MAX_UPLOAD_SIZE_BYTES;

        let mut data = b"%PDF".to_vec();
        data.resize(MAX_UPLOAD_SIZE_BYTES as usize, 0);
        assert_eq!(
            validate_upload(
                Some("big.pdf"),
                Some("application/pdf"),
                &data,
                MAX_UPLOAD_SIZE_BYTES
            ),
            Ok(())
        );

        data.push(0);
        assert!(matches!(
            validate_upload(
                Some("big.pdf"),
                Some("application/pdf"),
                &data,
                MAX_UPLOAD_SIZE_BYTES
            ),
            Err(UploadRejection::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_empty_file() {
        assert_eq!(
            validate_upload(Some("x.pdf"), Some("application/pdf"), b"", LIMIT),
            Err(UploadRejection::EmptyFile)
        );
    }

    #[test]
    fn test_validate_invalid_signature() {
        let payloads: [&[u8]; 5] = [
            b"not a pdf",
            b"%PD",
            b"PDF%",
            b" %PDF-1.4",
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        ];
        for payload in payloads {
            let result = validate_upload(Some("x.pdf"), Some("application/pdf"), payload, LIMIT);
            assert!(
                matches!(result, Err(UploadRejection::InvalidSignature { .. })),
                "{:?} should fail the signature check",
                payload
            );
        }
    }

    #[test]
    fn test_validate_invalid_signature_reports_detected_type() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(
            validate_upload(Some("x.pdf"), Some("application/pdf"), &png, LIMIT),
            Err(UploadRejection::InvalidSignature {
                detected: Some("image/png".to_string())
            })
        );
    }

    #[test]
    fn test_validate_order_short_circuits() {
        // Every check would fail; the first one in order wins.
        assert_eq!(
            validate_upload(None, Some("text/plain"), b"", LIMIT),
            Err(UploadRejection::MissingFilename)
        );
        assert!(matches!(
            validate_upload(Some("a.txt"), Some("text/plain"), b"", LIMIT),
            Err(UploadRejection::UnsupportedExtension(_))
        ));
        assert!(matches!(
            validate_upload(Some("a.pdf"), Some("text/plain"), b"", LIMIT),
            Err(UploadRejection::UnsupportedContentType(_))
        ));
        assert!(matches!(
            validate_upload(Some("a.pdf"), Some("application/pdf"), &[0u8; 2048], LIMIT),
            Err(UploadRejection::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_mismatched_layers() {
        // Right signature, wrong declared type.
        assert!(validate_upload(Some("a.pdf"), Some("image/png"), b"%PDF", LIMIT).is_err());
        // Right type and signature, wrong extension.
        assert!(validate_upload(Some("a.png"), Some("application/pdf"), b"%PDF", LIMIT).is_err());
        // Right extension and type, wrong signature.
        assert!(validate_upload(Some("a.pdf"), Some("application/pdf"), b"GIF89a", LIMIT).is_err());
    }

    #[test]
    fn test_has_pdf_signature() {
        assert!(has_pdf_signature(b"%PDF"));
        assert!(has_pdf_signature(b"%PDF-2.0\n"));
        assert!(!has_pdf_signature(b"%PD"));
        assert!(!has_pdf_signature(b""));
    }
}
