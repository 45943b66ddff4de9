use std::path::Path;

/// Derives the vector collection name for an uploaded file.
///
/// The final extension is stripped and spaces become underscores, so
/// `"Lecture notes.docx"` maps to `"Lecture_notes"`.
pub fn prepare_collection_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);

    stem.replace(' ', "_")
}

/// Returns the file extension including the leading dot, or an empty string.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_collection_name() {
        assert_eq!(prepare_collection_name("Lecture notes.docx"), "Lecture_notes");
        assert_eq!(prepare_collection_name("a b c.docx"), "a_b_c");
        assert_eq!(prepare_collection_name("report.v2.docx"), "report.v2");
        assert_eq!(prepare_collection_name("plain"), "plain");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("notes.docx"), ".docx");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
    }
}
