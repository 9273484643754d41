//! Content-addressed interning of cell styles.

use super::CellStyle;
use ahash::AHashMap;
use std::sync::Arc;

/// An opaque, non-negative style id. Dense and stable within the
/// [`StyleRegistry`] that produced it; the default style is always id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(pub u32);

impl StyleId {
    pub const DEFAULT: StyleId = StyleId(0);

    pub fn index(self) -> u32 {
        self.0
    }
}

impl Default for StyleId {
    fn default() -> Self {
        StyleId::DEFAULT
    }
}

/// Hash of a style's canonical content, used as the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StyleKey(u64);

impl StyleKey {
    fn from_style(style: &CellStyle) -> Self {
        use std::hash::{Hash, Hasher};
        let mut hasher = ahash::AHasher::default();
        style.hash(&mut hasher);
        StyleKey(hasher.finish())
    }
}

/// Interns [`CellStyle`] values by canonical content key, handing out dense,
/// stable integer ids. `register` is a value operation: it returns a new
/// registry rather than mutating in place, so a [`crate::sheet::Sheet`] can
/// share its registry structurally with prior versions of itself. The
/// working set of distinct styles in a real workbook is small (tens to a
/// few hundred), so the clone this implies is cheap relative to cell
/// storage.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    styles: Arc<Vec<CellStyle>>,
    index: Arc<AHashMap<StyleKey, StyleId>>,
}

impl StyleRegistry {
    /// A registry containing only the default style at id 0.
    pub fn new() -> Self {
        let default = CellStyle::default();
        let key = StyleKey::from_style(&default);
        let mut index = AHashMap::with_capacity(64);
        index.insert(key, StyleId::DEFAULT);
        Self { styles: Arc::new(vec![default]), index: Arc::new(index) }
    }

    /// Intern `style`, returning the (possibly new) registry and its id.
    pub fn register(&self, style: CellStyle) -> (Self, StyleId) {
        let key = StyleKey::from_style(&style);
        if let Some(&id) = self.index.get(&key) {
            if self.styles[id.index() as usize] == style {
                return (self.clone(), id);
            }
        }
        let id = StyleId(self.styles.len() as u32);
        let mut styles = (*self.styles).clone();
        let mut index = (*self.index).clone();
        styles.push(style);
        index.insert(key, id);
        (Self { styles: Arc::new(styles), index: Arc::new(index) }, id)
    }

    /// Look up a style by id.
    pub fn get(&self, id: StyleId) -> Option<&CellStyle> {
        self.styles.get(id.index() as usize)
    }

    /// The default style (id 0).
    pub fn default_style(&self) -> &CellStyle {
        &self.styles[0]
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Iterate over all styles with their ids, in registration order (the
    /// order styles.xml will emit them in).
    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &CellStyle)> {
        self.styles.iter().enumerate().map(|(i, s)| (StyleId(i as u32), s))
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn default_style_is_id_zero() {
        let reg = StyleRegistry::new();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(StyleId::DEFAULT), Some(&CellStyle::default()));
    }

    #[test]
    fn register_dedups_by_content() {
        let reg = StyleRegistry::new();
        let style1 = CellStyle::new().bold(true);
        let style2 = CellStyle::new().bold(true);
        let style3 = CellStyle::new().italic(true);

        let (reg, id1) = reg.register(style1);
        let (reg, id2) = reg.register(style2);
        let (reg, id3) = reg.register(style3);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn register_returns_new_registry_leaving_old_intact() {
        let reg0 = StyleRegistry::new();
        let (reg1, id) = reg0.register(CellStyle::new().bold(true));
        assert_eq!(reg0.len(), 1);
        assert_eq!(reg1.len(), 2);
        assert!(reg1.get(id).is_some());
    }

    #[test]
    fn complex_style_round_trips() {
        let reg = StyleRegistry::new();
        let style = CellStyle::new().bold(true).italic(true).font_size(14.0).fill_color(Color::RED);
        let (reg, id) = reg.register(style.clone());
        assert!(id.index() > 0);
        assert_eq!(reg.get(id), Some(&style));
    }
}
