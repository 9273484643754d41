//! The populated cell record: `(ref, value, styleId?, comment?, hyperlink?)`.

use super::{ARef, CellValue, Hyperlink};
use crate::comment::CellComment;
use crate::style::StyleId;

/// A single populated cell. Sheets only store entries for non-empty cells;
/// reading an absent ref yields [`Cell::empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub reference: ARef,
    pub value: CellValue,
    pub style_id: Option<StyleId>,
    pub comment: Option<CellComment>,
    pub hyperlink: Option<Hyperlink>,
}

impl Cell {
    /// An empty cell at `reference`, carrying no style, comment, or hyperlink.
    pub fn empty(reference: ARef) -> Self {
        Self { reference, value: CellValue::Empty, style_id: None, comment: None, hyperlink: None }
    }

    /// A cell with just a value, no style/comment/hyperlink.
    pub fn new(reference: ARef, value: CellValue) -> Self {
        Self { reference, value, style_id: None, comment: None, hyperlink: None }
    }

    /// Replace the value, preserving any existing style, comment, and hyperlink.
    pub fn with_value(&self, value: CellValue) -> Self {
        Self { reference: self.reference, value, ..self.clone() }
    }

    pub fn with_style_id(&self, style_id: StyleId) -> Self {
        Self { style_id: Some(style_id), ..self.clone() }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_id.is_none() && self.comment.is_none() && self.hyperlink.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Row;
    use crate::cell::Column;

    fn a1() -> ARef {
        ARef::new(Row::new(0).unwrap(), Column::new(0).unwrap())
    }

    #[test]
    fn put_preserves_style() {
        let c = Cell::empty(a1()).with_style_id(StyleId(3)).with_value(CellValue::from(5i64));
        assert_eq!(c.style_id, Some(StyleId(3)));
        assert_eq!(c.value, CellValue::from(5i64));
    }
}
