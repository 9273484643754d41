//! Common imports for `xlforge` users.
//!
//! ```rust
//! use xlforge::prelude::*;
//! ```

pub use crate::{
    calculation::{CalculationStats, WorkbookCalculationExt},
    recalculate,
    Alignment,
    Anchor,
    ARef,
    BorderEdge,
    BorderLineStyle,
    BorderStyle,
    Cell,
    CellComment,
    CellError,
    CellRange,
    CellStyle,
    // Cell types
    CellValue,
    Color,
    Column,
    DependencyGraph,
    EvalContext,
    // Error types
    Error,
    Expr,
    FillStyle,
    FontStyle,
    FormulaError,
    HorizontalAlignment,
    Hyperlink,
    NumberFormat,
    PageSetup,
    QualifiedRef,
    ReaderConfig,
    Result,
    // Main types
    Row,
    Sheet,
    SheetName,
    StyleId,
    Table,
    Value,
    VerticalAlignment,
    Workbook,
    // Extension traits
    WorkbookExt,
    WorkbookSettings,
    WriterConfig,
    // I/O types
    XlsxError,
    XlsxReader,
    XlsxWriter,
};
