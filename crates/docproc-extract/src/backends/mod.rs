//! PDF backends.

pub mod lopdf;
pub mod pdftotext;

pub use self::lopdf::LopdfBackend;
pub use self::pdftotext::PdftotextBackend;
