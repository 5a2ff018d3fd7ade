//! XML emission
//!
//! `XmlWriter` is a forward-only element writer in the style of a streaming
//! XML writer (start element, attributes, end element) that builds an
//! `xmltree` element tree, so element and attribute order is exactly the order
//! of the calls. `XmlDocument` binds a writer to an output file and only
//! touches the disk on [`XmlDocument::finish`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use urhoforge_core::{Error, Result};
use xmltree::{Element, EmitterConfig, XMLNode};

/// Forward-only XML element writer
#[derive(Debug, Default)]
pub struct XmlWriter {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl XmlWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new element as a child of the current one (or as the root)
    pub fn start_element(&mut self, name: &str) -> Result<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(Error::xml(format!(
                "cannot start <{}>: document already has a root element",
                name
            )));
        }
        self.stack.push(Element::new(name));
        Ok(())
    }

    /// Set an attribute on the element opened last
    pub fn attribute(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let element = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::xml(format!("attribute `{}` written outside of an element", name)))?;
        element.attributes.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Close the element opened last
    pub fn end_element(&mut self) -> Result<()> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| Error::xml("end_element without a matching start_element"))?;

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(XMLNode::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }

    /// Write a complete empty element with the given attributes
    pub fn element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.start_element(name)?;
        for (key, value) in attributes {
            self.attribute(key, *value)?;
        }
        self.end_element()
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Consume the writer and return the finished root element
    pub fn into_root(self) -> Result<Option<Element>> {
        if let Some(open) = self.stack.last() {
            return Err(Error::xml(format!("element <{}> was never closed", open.name)));
        }
        Ok(self.root)
    }

    /// Serialize the finished document (tab-indented, with declaration)
    pub fn write_to<W: Write>(self, out: W) -> Result<()> {
        match self.into_root()? {
            Some(root) => write_element(&root, out),
            None => Err(Error::xml("document has no root element")),
        }
    }
}

fn write_element<W: Write>(root: &Element, out: W) -> Result<()> {
    let config = EmitterConfig::new()
        .perform_indent(true)
        .indent_string("\t");
    root.write_with_config(out, config)
        .map_err(|e| Error::xml(e.to_string()))
}

/// XML output file handle.
///
/// Dropping a document without calling `finish` discards it; nothing is
/// written for abandoned exports.
#[derive(Debug)]
pub struct XmlDocument {
    path: PathBuf,
    writer: XmlWriter,
    finished: bool,
}

impl XmlDocument {
    /// Create a document that will be written to `path`
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: XmlWriter::new(),
            finished: false,
        }
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writer for the document body
    pub fn writer(&mut self) -> &mut XmlWriter {
        &mut self.writer
    }

    /// Write the document to its destination.
    ///
    /// Returns `false` when nothing was written into the document.
    pub fn finish(mut self) -> Result<bool> {
        self.finished = true;
        let writer = std::mem::take(&mut self.writer);

        let Some(root) = writer.into_root()? else {
            debug!(path = %self.path.display(), "Empty document, nothing written");
            return Ok(false);
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&self.path)?);
        write_element(&root, &mut out)?;
        out.flush()?;

        debug!(path = %self.path.display(), root = %root.name, "Document written");
        Ok(true)
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.finished {
            debug!(path = %self.path.display(), "Unfinished document discarded");
        }
    }
}
