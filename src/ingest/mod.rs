pub mod detector;
pub mod dispatcher;
pub mod formats;
pub mod hasher;
pub mod text;

pub use detector::detect;
pub use dispatcher::Dispatcher;
pub use text::{pdf::PdfTextExtractor, plaintext::PlainTextExtractor, TextExtractor};
