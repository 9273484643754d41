//! The patch algebra: a composable, monoidal description of sheet edits,
//! applied atomically by [`apply`].

use crate::cell::{ARef, CellRange, CellValue};
use crate::sheet::Sheet;
use crate::style::{CellStyle, StyleId};

/// A single edit or a batch of them. `Batch` is the monoid identity carrier:
/// `Batch(vec![])` is the identity element, and nested batches flatten on
/// construction via [`Patch::batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Put(ARef, CellValue),
    SetStyle(ARef, StyleId),
    SetCellStyle(ARef, CellStyle),
    ClearStyle(ARef),
    Merge(CellRange),
    Unmerge(CellRange),
    RemoveRange(CellRange),
    Batch(Vec<Patch>),
}

impl Patch {
    /// The identity element of the monoid.
    pub fn empty() -> Self {
        Patch::Batch(Vec::new())
    }

    /// Combine two patches, flattening nested `Batch`es so that
    /// `batch([batch([p1, p2]), p3])` and `batch([p1, p2, p3])` are equal.
    pub fn combine(self, other: Patch) -> Patch {
        let mut flat = Vec::new();
        flatten_into(self, &mut flat);
        flatten_into(other, &mut flat);
        Patch::Batch(flat)
    }

    /// Build a (flattened) batch from a sequence of patches.
    pub fn batch(patches: impl IntoIterator<Item = Patch>) -> Patch {
        let mut flat = Vec::new();
        for p in patches {
            flatten_into(p, &mut flat);
        }
        Patch::Batch(flat)
    }
}

fn flatten_into(patch: Patch, out: &mut Vec<Patch>) {
    match patch {
        Patch::Batch(inner) => {
            for p in inner {
                flatten_into(p, out);
            }
        }
        other => out.push(other),
    }
}

/// Apply `patch` to `sheet`, returning a new sheet. Total for all patches
/// that don't leave the merged-range invariant violated (that invariant is
/// checked only at write time, not here). A `Batch` applies its elements
/// left to right.
pub fn apply(sheet: &Sheet, patch: &Patch) -> Sheet {
    match patch {
        Patch::Put(r, v) => sheet.put(*r, v.clone()),
        Patch::SetStyle(r, id) => sheet.set_style(*r, *id),
        Patch::SetCellStyle(r, style) => sheet.set_cell_style(*r, style.clone()),
        Patch::ClearStyle(r) => sheet.clear_style(*r),
        Patch::Merge(range) => sheet.merge(*range),
        Patch::Unmerge(range) => sheet.unmerge(*range),
        Patch::RemoveRange(range) => sheet.clear_in_range(*range),
        Patch::Batch(patches) => {
            let mut s = sheet.clone();
            for p in patches {
                s = apply(&s, p);
            }
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Anchor, Column, Row, SheetName};
    use crate::style::NumberFormat;

    fn sheet() -> Sheet {
        Sheet::new(SheetName::new("Sheet1").unwrap())
    }

    fn aref(row: u32, col: u32) -> ARef {
        ARef::new(Row::new(row).unwrap(), Column::new(col).unwrap())
    }

    #[test]
    fn identity_is_a_no_op() {
        let s = sheet().put(aref(0, 0), CellValue::from(1i64));
        let s2 = apply(&s, &Patch::empty());
        assert_eq!(s2.get(aref(0, 0)).value, CellValue::from(1i64));
    }

    #[test]
    fn batch_associativity() {
        let s = sheet();
        let p1 = Patch::Put(aref(0, 0), CellValue::from(1i64));
        let p2 = Patch::Put(aref(0, 1), CellValue::from(2i64));
        let p3 = Patch::Put(aref(0, 2), CellValue::from(3i64));

        let left = Patch::batch(vec![Patch::batch(vec![p1.clone(), p2.clone()]), p3.clone()]);
        let right = Patch::batch(vec![p1.clone(), Patch::batch(vec![p2.clone(), p3.clone()])]);
        let flat = Patch::batch(vec![p1, p2, p3]);

        assert_eq!(left, flat);
        assert_eq!(right, flat);
        let (a, b, c) = (apply(&s, &left), apply(&s, &right), apply(&s, &flat));
        assert_eq!(a.get(aref(0, 2)).value, b.get(aref(0, 2)).value);
        assert_eq!(a.get(aref(0, 2)).value, c.get(aref(0, 2)).value);
    }

    #[test]
    fn idempotence_on_put() {
        let s = sheet();
        let p = Patch::Put(aref(0, 0), CellValue::from(7i64));
        let once = apply(&s, &p);
        let twice = apply(&once, &p);
        assert_eq!(once.get(aref(0, 0)).value, twice.get(aref(0, 0)).value);
    }

    #[test]
    fn last_write_wins() {
        let s = sheet();
        let p1 = Patch::Put(aref(0, 0), CellValue::from(1i64));
        let p2 = Patch::Put(aref(0, 0), CellValue::from(2i64));
        let via_batch = apply(&s, &Patch::batch(vec![p1.clone(), p2.clone()]));
        let via_direct = apply(&s, &p2);
        assert_eq!(via_batch.get(aref(0, 0)).value, via_direct.get(aref(0, 0)).value);
    }

    #[test]
    fn merge_then_unmerge_restores_empty_set() {
        let s = sheet();
        let range = CellRange::new(aref(0, 0), Anchor::Relative, aref(0, 2), Anchor::Relative);
        let s = apply(&s, &Patch::Merge(range));
        assert_eq!(s.merged_ranges(), &[range]);
        let s = apply(&s, &Patch::Unmerge(range));
        assert!(s.merged_ranges().is_empty());
    }

    #[test]
    fn remove_range_filters_without_materializing() {
        let s = sheet().put(aref(0, 0), CellValue::from(1i64)).put(aref(5, 5), CellValue::from(2i64));
        let range = CellRange::new(aref(0, 0), Anchor::Relative, aref(2, 2), Anchor::Relative);
        let s = apply(&s, &Patch::RemoveRange(range));
        assert!(s.get(aref(0, 0)).is_empty());
        assert_eq!(s.get(aref(5, 5)).value, CellValue::from(2i64));
    }

    #[test]
    fn patch_composition_scenario() {
        let range = CellRange::new(aref(0, 0), Anchor::Relative, aref(0, 2), Anchor::Relative);
        let style = CellStyle::new().bold(true).font_size(14.0).number_format(NumberFormat::General);
        let patch = Patch::batch(vec![
            Patch::Put(aref(0, 0), CellValue::text("Title")),
            Patch::SetCellStyle(aref(0, 0), style.clone()),
            Patch::Merge(range),
        ]);
        let s = apply(&sheet(), &patch);
        assert_eq!(s.get(aref(0, 0)).value, CellValue::text("Title"));
        let id = s.get(aref(0, 0)).style_id.unwrap();
        assert_eq!(s.style_registry().get(id), Some(&style));
        assert_eq!(s.merged_ranges(), &[range]);
    }
}
