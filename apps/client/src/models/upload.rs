use std::path::Path;

use bytes::Bytes;

use crate::errors::ValidationError;
use crate::models::analysis::ExperienceLevel;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const UNKNOWN_MIME: &str = "application/octet-stream";

/// 10 MiB, inclusive.
pub const MAX_RESUME_BYTES: u64 = 10 * 1024 * 1024;

/// A résumé blob with its declared name and MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());
        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Declared MIME type for a résumé path, by extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MIME,
        Some("docx") => DOCX_MIME,
        _ => UNKNOWN_MIME,
    }
}

/// Accepts iff the type is PDF or DOCX and the size is at most 10 MiB.
/// Type is checked before size.
pub fn validate_resume(file: &ResumeFile) -> Result<(), ValidationError> {
    if file.mime_type != PDF_MIME && file.mime_type != DOCX_MIME {
        return Err(ValidationError::UnsupportedFileType);
    }
    if file.size() > MAX_RESUME_BYTES {
        return Err(ValidationError::FileTooLarge);
    }
    Ok(())
}

/// The transient submission being assembled on the upload screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDraft {
    pub file: Option<ResumeFile>,
    pub job_description: String,
    pub target_role: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
}

/// A validated draft, ready for `POST /ats/analyze`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub file: ResumeFile,
    pub job_description: String,
    pub target_role: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_of(mime: &str, size: usize) -> ResumeFile {
        ResumeFile::new("cv", mime, vec![0u8; size])
    }

    #[test]
    fn test_pdf_and_docx_accepted() {
        assert_eq!(validate_resume(&file_of(PDF_MIME, 1024)), Ok(()));
        assert_eq!(validate_resume(&file_of(DOCX_MIME, 1024)), Ok(()));
    }

    #[test]
    fn test_other_types_rejected() {
        for mime in ["application/msword", "text/plain", "image/png", ""] {
            assert_eq!(
                validate_resume(&file_of(mime, 10)),
                Err(ValidationError::UnsupportedFileType),
                "{mime}"
            );
        }
    }

    #[test]
    fn test_exactly_ten_mib_accepted() {
        let file = file_of(PDF_MIME, MAX_RESUME_BYTES as usize);
        assert_eq!(validate_resume(&file), Ok(()));
    }

    #[test]
    fn test_eleven_mib_rejected() {
        let file = file_of(PDF_MIME, 11_534_336);
        assert_eq!(validate_resume(&file), Err(ValidationError::FileTooLarge));
    }

    #[test]
    fn test_type_checked_before_size() {
        let file = file_of("text/plain", 11_534_336);
        assert_eq!(
            validate_resume(&file),
            Err(ValidationError::UnsupportedFileType)
        );
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("cv.PDF")), PDF_MIME);
        assert_eq!(mime_for_path(Path::new("dir/cv.docx")), DOCX_MIME);
        assert_eq!(mime_for_path(Path::new("cv.doc")), UNKNOWN_MIME);
        assert_eq!(mime_for_path(Path::new("README")), UNKNOWN_MIME);
    }

    #[tokio::test]
    async fn test_from_path_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let file = ResumeFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "resume.pdf");
        assert_eq!(file.mime_type, PDF_MIME);
        assert_eq!(file.size(), 8);
    }
}
