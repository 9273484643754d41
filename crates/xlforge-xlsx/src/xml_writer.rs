//! Push-style XML serialization: `start_doc/start_element/write_attribute/
//! write_characters/end_element/end_doc`, with attributes always flushed in
//! lexicographic order so two writers given the same calls in a different
//! attribute-push order still produce byte-identical output.
//!
//! This sits below every per-part serializer in `writer/`; none of them
//! touch `std::io::Write` or escaping directly.

use std::io::Write;

use crate::error::XlsxResult;

/// A single open-but-not-yet-flushed element: its name and the attributes
/// pushed onto it so far, in push order (sorted only at flush time).
struct Pending {
    name: String,
    attrs: Vec<(String, String)>,
}

pub struct XmlWriter<W: Write> {
    out: W,
    open: Vec<String>,
    pending: Option<Pending>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, open: Vec::new(), pending: None }
    }

    pub fn start_doc(&mut self) -> XlsxResult<()> {
        self.out.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")?;
        Ok(())
    }

    /// Close every still-open element and flush. Call exactly once, last.
    pub fn end_doc(&mut self) -> XlsxResult<()> {
        self.flush_pending()?;
        while let Some(name) = self.open.pop() {
            write!(self.out, "</{name}>")?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn start_element(&mut self, name: &str) -> XlsxResult<()> {
        self.flush_pending()?;
        self.pending = Some(Pending { name: name.to_string(), attrs: Vec::new() });
        Ok(())
    }

    /// Attach an attribute to the element most recently opened by
    /// `start_element`, provided no text or child element has been written
    /// to it yet.
    pub fn write_attribute(&mut self, name: &str, value: &str) {
        if let Some(pending) = self.pending.as_mut() {
            pending.attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn write_characters(&mut self, text: &str) -> XlsxResult<()> {
        self.flush_pending()?;
        write!(self.out, "{}", quick_xml::escape::escape(text))?;
        Ok(())
    }

    /// Write an already-escaped fragment verbatim (used for the SST's raw
    /// `<si>` bodies, which may carry rich-text runs the caller assembled).
    pub fn write_raw(&mut self, raw: &str) -> XlsxResult<()> {
        self.flush_pending()?;
        write!(self.out, "{raw}")?;
        Ok(())
    }

    pub fn end_element(&mut self) -> XlsxResult<()> {
        match self.pending.take() {
            Some(pending) => self.write_tag(&pending, true),
            None => {
                let name = self.open.pop().expect("end_element without a matching start_element");
                write!(self.out, "</{name}>")?;
                Ok(())
            }
        }
    }

    pub fn flush(&mut self) -> XlsxResult<()> {
        self.flush_pending()?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(mut self) -> XlsxResult<W> {
        self.flush_pending()?;
        Ok(self.out)
    }

    fn flush_pending(&mut self) -> XlsxResult<()> {
        if let Some(pending) = self.pending.take() {
            self.write_tag(&pending, false)?;
            self.open.push(pending.name);
        }
        Ok(())
    }

    fn write_tag(&mut self, pending: &Pending, self_closing: bool) -> XlsxResult<()> {
        let mut attrs = pending.attrs.clone();
        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        write!(self.out, "<{}", pending.name)?;
        for (k, v) in &attrs {
            write!(self.out, " {k}=\"{}\"", quick_xml::escape::escape(v))?;
        }
        if self_closing {
            write!(self.out, "/>")?;
        } else {
            write!(self.out, ">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_flush_lexicographically_regardless_of_push_order() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_doc().unwrap();
        w.start_element("c").unwrap();
        w.write_attribute("t", "s");
        w.write_attribute("r", "A1");
        w.write_attribute("s", "2");
        w.end_element().unwrap();
        w.end_doc().unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert!(out.contains(r#"<c r="A1" s="2" t="s"/>"#));
    }

    #[test]
    fn nested_elements_close_in_reverse_order() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_element("a").unwrap();
        w.start_element("b").unwrap();
        w.write_characters("x").unwrap();
        w.end_element().unwrap();
        w.end_element().unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "<a><b>x</b></a>");
    }

    #[test]
    fn text_is_escaped() {
        let mut w = XmlWriter::new(Vec::new());
        w.start_element("t").unwrap();
        w.write_characters("a < b & c").unwrap();
        w.end_element().unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "<t>a &lt; b &amp; c</t>");
    }
}
