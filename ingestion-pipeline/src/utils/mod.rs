pub mod document_loader;
pub mod splitter;
