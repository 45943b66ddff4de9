use common::error::AppError;
use text_splitter::{ChunkConfig, TextSplitter};

/// Splits `text` into ordered chunks of at most `chunk_size` characters, with
/// neighbouring chunks sharing up to `overlap` characters.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, AppError> {
    if chunk_size == 0 {
        return Err(AppError::Validation("chunk size must be positive".into()));
    }

    let chunk_config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;
    let splitter = TextSplitter::new(chunk_config);

    Ok(splitter
        .chunks(text)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_owned)
        .collect())
}
