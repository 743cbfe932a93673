//! In-memory filter list

use crate::rules::ParseOptions;

/// A filter list held as text.
#[derive(Debug, Clone)]
pub struct StringRuleList {
    id: u32,
    text: String,
    options: ParseOptions,
}

impl StringRuleList {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            options: ParseOptions::default(),
        }
    }

    /// Drop cosmetic rules when loading.
    pub fn ignore_cosmetic(mut self, ignore: bool) -> Self {
        self.options.ignore_cosmetic = ignore;
        self
    }

    /// Drop `#%#` script rules when loading.
    pub fn ignore_js(mut self, ignore: bool) -> Self {
        self.options.ignore_js = ignore;
        self
    }

    /// Drop `@@` allow-list rules when loading.
    pub fn ignore_exceptions(mut self, ignore: bool) -> Self {
        self.options.ignore_exceptions = ignore;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.options
    }

    /// Lines with the byte offset of their first character.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let mut offset = 0;
        self.text.split('\n').map(move |raw| {
            let start = offset;
            offset += raw.len() + 1;
            (start, raw.strip_suffix('\r').unwrap_or(raw))
        })
    }

    /// The line starting at `offset`, if `offset` is a line start.
    pub fn line_at(&self, offset: usize) -> Option<&str> {
        if offset > 0 && self.text.as_bytes().get(offset - 1) != Some(&b'\n') {
            return None;
        }
        let rest = self.text.get(offset..)?;
        let line = rest.split('\n').next().unwrap_or_default();
        Some(line.strip_suffix('\r').unwrap_or(line))
    }
}
