//! Streaming access to OSM XML.
//!
//! [`ElementReader`] walks the document with `quick-xml` and yields every
//! element once its closing tag has been read, with its descendants attached.
//! Elements directly under the document root are handed out and then dropped,
//! so memory stays bounded by the largest `node`/`way` subtree rather than the
//! size of the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// One parsed XML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`Element::attr`], but a missing attribute is an error.
    pub fn require_attr(&self, key: &'static str) -> Result<&str> {
        self.attr(key)
            .ok_or_else(|| Error::missing_attribute(self.tag.as_str(), key))
    }

    /// Depth-first, pre-order walk over this element and all of its
    /// descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// The `node`/`way` elements carry the data we audit and export.
    pub fn is_node_or_way(&self) -> bool {
        matches!(self.tag.as_str(), "node" | "way")
    }

    /// `(k, v)` of every `tag` element below this one whose `k` equals `key`.
    pub fn tag_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = Result<&'a str>> + 'a {
        self.descendants()
            .filter(|element| element.tag == "tag")
            .filter_map(move |tag| match tag.require_attr("k") {
                Ok(k) if k == key => Some(tag.require_attr("v")),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// Forward-only iterator over the elements of an XML document.
pub struct ElementReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<Element>,
    finished: bool,
}

/// Opens a fresh pass over the file at `path`.
pub fn open(path: &Path) -> Result<ElementReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ElementReader::from_reader(BufReader::new(file)))
}

impl<R: BufRead> ElementReader<R> {
    pub fn from_reader(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            open: Vec::new(),
            finished: false,
        }
    }

    fn next_element(&mut self) -> Result<Option<Element>> {
        loop {
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| Error::Xml {
                    position: self.reader.buffer_position(),
                    source,
                })?;

            let complete = match event {
                Event::Start(start) => {
                    let element = element_from_start(&start, &self.reader)?;
                    self.open.push(element);
                    None
                }
                Event::Empty(start) => Some(element_from_start(&start, &self.reader)?),
                Event::End(_) => self.open.pop(),
                Event::Eof => {
                    if !self.open.is_empty() {
                        return Err(Error::UnexpectedEof {
                            open: self.open.len(),
                        });
                    }
                    return Ok(None);
                }
                _ => None,
            };
            self.buf.clear();

            if let Some(element) = complete {
                return Ok(Some(self.attach(element)));
            }
        }
    }

    /// Hands `element` to its parent unless the parent is the document root.
    fn attach(&mut self, element: Element) -> Element {
        if self.open.len() >= 2 {
            if let Some(parent) = self.open.last_mut() {
                parent.children.push(element.clone());
            }
        }
        element
    }
}

impl<R: BufRead> Iterator for ElementReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.next_element().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

fn element_from_start<R>(start: &BytesStart<'_>, reader: &Reader<R>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        let value = attr.unescape_value().map_err(|source| Error::Xml {
            position: reader.buffer_position(),
            source,
        })?;
        element.attrs.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}
