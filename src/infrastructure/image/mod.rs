//! Image codecs.

pub mod preview;

pub use preview::{CodecPreviewGenerator, PreviewSettings};
