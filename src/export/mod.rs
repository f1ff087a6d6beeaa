pub mod csv;
pub mod pdf;

pub use pdf::PdfBuilder;
