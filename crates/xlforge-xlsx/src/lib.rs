//! # xlforge-xlsx
//!
//! Streaming OOXML (.xlsx) codec for xlforge: reads and writes the
//! `Workbook`/`Sheet` data model in `xlforge-core` over a ZIP container of
//! `spreadsheetml` parts, with a lower-level row-stream API for reading and
//! writing at a scale too large to materialize as a `Sheet`.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;
mod xml_guard;
mod xml_writer;

pub use error::{XlsxError, XlsxResult};
pub use reader::{read_sheet_stream, read_stream, read_stream_by_index, read_stream_range, ReaderConfig, XlsxReader};
pub use writer::{Compression, SstPolicy, WriterConfig, XlsxWriter};
