use scraper::{ElementRef, Html, Selector};

use super::blocks::RawTextSequence;

/// What to pull out of one matched element.
pub enum TextSource {
    /// Concatenated text of the element and its descendants.
    InnerText,
    /// Value of the named attribute.
    Attribute(&'static str),
}

/// One element kind believed to carry review text.
pub struct TextRule {
    pub selector: Selector,
    pub source: TextSource,
}

impl TextRule {
    fn read(&self, el: &ElementRef) -> Option<String> {
        match self.source {
            TextSource::InnerText => Some(el.text().collect()),
            TextSource::Attribute(name) => el.value().attr(name).map(str::to_string),
        }
    }
}

/// Flatten the markup into the text of every element matched by any rule,
/// in document order. An element matched by several rules is read by the
/// first one.
pub fn extract_texts(markup: &str, rules: &[TextRule]) -> RawTextSequence {
    let doc = Html::parse_document(markup);
    let mut out = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if let Some(text) = rules
            .iter()
            .find(|r| r.selector.matches(&el))
            .and_then(|r| r.read(&el))
        {
            out.push(text);
        }
    }
    RawTextSequence(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<TextRule> {
        vec![
            TextRule {
                selector: Selector::parse("span, h3").unwrap(),
                source: TextSource::InnerText,
            },
            TextRule {
                selector: Selector::parse(r#"div[aria-label*="out of 5"]"#).unwrap(),
                source: TextSource::Attribute("aria-label"),
            },
        ]
    }

    #[test]
    fn document_order_with_attributes() {
        let html = r#"<html><body>
            <h3>Title</h3>
            <div aria-label="4 out of 5"><svg></svg></div>
            <p>ignored</p>
            <div aria-label="menu">skip</div>
            <span>Management</span>
            <div aria-label="2 out of 5"></div>
        </body></html>"#;
        let seq = extract_texts(html, &rules());
        assert_eq!(seq.0, vec!["Title", "4 out of 5", "Management", "2 out of 5"]);
    }

    #[test]
    fn empty_page_yields_empty_sequence() {
        assert!(extract_texts("<html></html>", &rules()).0.is_empty());
    }
}
