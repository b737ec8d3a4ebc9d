//! PDF assembly: writer, composer, fonts, outline, metadata.

pub mod composer;
pub mod conformance;
pub mod content;
pub mod font;
pub mod image;
pub mod object;
pub mod outline;
pub mod stamper;
pub mod syntax;
pub mod writer;
pub mod xmp;

pub use composer::{compose, ComposerOptions};
pub use conformance::PdfALevel;
pub use writer::WrittenPdf;
