//! XXE defense shared by every XML part on the read path.

use crate::error::{XlsxError, XlsxResult};

/// A `<!DOCTYPE` can only appear in the prolog, before the root element, so
/// a small leading window is enough to catch it without reading the whole
/// part. `quick_xml` itself never resolves external entities or DTDs, but a
/// declared DOCTYPE is a signal the producer meant one to be honored, and
/// honoring it silently would be the XXE hole; refuse outright instead.
pub(crate) fn reject_doctype(xml: &[u8], part: &str) -> XlsxResult<()> {
    let window = &xml[..xml.len().min(4096)];
    if window.windows(9).any(|w| w.eq_ignore_ascii_case(b"<!doctype")) {
        return Err(XlsxError::XxeRejected(part.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_xml_passes() {
        assert!(reject_doctype(b"<?xml version=\"1.0\"?><root/>", "test").is_ok());
    }

    #[test]
    fn doctype_is_rejected() {
        let xml = b"<?xml version=\"1.0\"?><!DOCTYPE root [<!ENTITY x SYSTEM \"file:///etc/passwd\">]><root/>";
        assert!(reject_doctype(xml, "test").is_err());
    }

    #[test]
    fn lowercase_doctype_is_rejected() {
        assert!(reject_doctype(b"<!doctype x><r/>", "test").is_err());
    }
}
