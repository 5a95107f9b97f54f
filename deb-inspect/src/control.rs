// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Control file parsing.

The `control` file inside a package's `control.tar` is a series of
`Name: value` header lines. A value may be folded over multiple lines by
starting each continuation line with a space or tab.

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>
for the canonical description of the format.
*/

use {
    slog::debug,
    std::{collections::HashMap, io::Write},
};

/// A field in a control file.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlField {
    name: String,
    value: String,
}

impl ControlField {
    /// Construct an instance from a field name and value.
    pub fn new(name: impl ToString, value: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// The name of this field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value of this field.
    ///
    /// Continuation lines are included verbatim, each preceded by a newline.
    pub fn value_str(&self) -> &str {
        &self.value
    }

    /// Obtain an iterator of words in the value.
    pub fn iter_words(&self) -> impl Iterator<Item = &str> {
        self.value.split_ascii_whitespace()
    }

    /// Obtain an iterator of lines in the value.
    ///
    /// Leading whitespace from each line is stripped.
    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.value.lines().map(|x| x.trim_start())
    }

    fn append_line(&mut self, line: &str) {
        self.value.push('\n');
        self.value.push_str(line);
    }

    /// Write the contents of this field to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(b": ")?;
        writer.write_all(self.value.as_bytes())?;
        writer.write_all(b"\n")
    }
}

/// The fields of a control file.
///
/// Fields retain the order they were first defined in. Field names are case sensitive.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlFields {
    fields: Vec<ControlField>,
}

impl ControlFields {
    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Set the value of a field.
    ///
    /// If a field with the same name already exists, its value is replaced and
    /// it keeps its original position.
    pub fn set_field(&mut self, field: ControlField) {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            existing.value = field.value;
        } else {
            self.fields.push(field);
        }
    }

    /// Set the value of a field defined via strings.
    pub fn set_field_from_string(&mut self, name: impl ToString, value: impl ToString) {
        self.set_field(ControlField::new(name, value));
    }

    /// Whether a named field is present.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Obtain the field with a given name.
    pub fn field(&self, name: &str) -> Option<&ControlField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut ControlField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Obtain the raw string value of the named field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value_str())
    }

    /// Iterate over fields.
    ///
    /// Iteration order is insertion order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField> {
        self.fields.iter()
    }

    /// Convert to a [HashMap] of field names to values.
    pub fn as_str_hash_map(&self) -> HashMap<&str, &str> {
        HashMap::from_iter(
            self.fields
                .iter()
                .map(|field| (field.name.as_str(), field.value_str())),
        )
    }

    /// The `Package` field.
    pub fn package(&self) -> Option<&str> {
        self.field_str("Package")
    }

    /// The `Version` field.
    pub fn version(&self) -> Option<&str> {
        self.field_str("Version")
    }

    /// The `Architecture` field.
    pub fn architecture(&self) -> Option<&str> {
        self.field_str("Architecture")
    }

    /// The `Maintainer` field.
    pub fn maintainer(&self) -> Option<&str> {
        self.field_str("Maintainer")
    }

    /// The `Description` field, including its extended description lines.
    pub fn description(&self) -> Option<&str> {
        self.field_str("Description")
    }

    /// The `Installed-Size` field, in KiB.
    pub fn installed_size(&self) -> Option<u64> {
        self.field_str("Installed-Size")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Serialize the fields to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for field in &self.fields {
            field.write(writer)?;
        }

        Ok(())
    }
}

/// Folds control file text into [ControlFields].
///
/// Instances are fed lines of text. Parsing never fails: lines that can't
/// be attributed to a field are logged and dropped.
pub struct ControlTextParser {
    logger: slog::Logger,
    fields: ControlFields,
    current: Option<String>,
}

impl ControlTextParser {
    /// Construct a new parser logging to `logger`.
    pub fn new(logger: slog::Logger) -> Self {
        Self {
            logger,
            fields: ControlFields::default(),
            current: None,
        }
    }

    /// Write a line to the parser.
    ///
    /// A trailing newline or carriage return is ignored.
    pub fn write_line(&mut self, line: &str) {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');

        // Comments are dropped even when they sit inside a folded value.
        if line.trim().starts_with('#') {
            return;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match self
                .current
                .as_deref()
                .and_then(|name| self.fields.field_mut(name))
            {
                Some(field) => field.append_line(line),
                None => {
                    debug!(
                        self.logger,
                        "ignoring control continuation line without field: {:?}", line
                    );
                }
            }

            return;
        }

        // An empty line ends a paragraph. Nothing folds across it.
        if line.is_empty() {
            self.current = None;
            return;
        }

        match line.split_once(':') {
            Some((name, value)) => {
                self.fields.set_field_from_string(name, value.trim());
                self.current = Some(name.to_string());
            }
            None => {
                debug!(self.logger, "ignoring control line without colon: {:?}", line);
                self.current = None;
            }
        }
    }

    /// Feed all lines of a text block to the parser.
    pub fn write_text(&mut self, text: &str) {
        for line in text.split('\n') {
            self.write_line(line);
        }
    }

    /// Finish parsing, consuming self.
    pub fn finish(self) -> ControlFields {
        self.fields
    }

    /// Parse a complete text block.
    pub fn parse(logger: &slog::Logger, data: &[u8]) -> ControlFields {
        let mut parser = Self::new(logger.clone());
        parser.write_text(&String::from_utf8_lossy(data));

        parser.finish()
    }
}
