// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interfaces for .deb package files.

The .deb file specification lives at <https://manpages.debian.org/unstable/dpkg-dev/deb.5.en.html>.

A .deb is an `ar` archive. Members are dispatched by name: `debian-binary`
holds the format version, `control.tar[.<ext>]` holds package metadata and
`data.tar[.<ext>]` holds the installed files. OpenWrt style `.ipk` files
share the layout but prefix member names with `./`.
*/

use {
    crate::error::{DebInspectError, Result},
    std::io::Read,
};

pub mod control_tar;
pub mod data_tar;
pub mod reader;

/// The role of a member of the outer `ar` archive.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArMemberKind {
    /// `control.tar[.<ext>]`.
    Control,
    /// `data.tar[.<ext>]`.
    Data,
    /// `_gpgbuilder`, a signature added by some signing tools.
    GpgBuilder,
    /// `debian-binary`, holding the package format version.
    DebianBinary,
    /// Anything else.
    Unrecognized,
}

impl ArMemberKind {
    /// Classify a normalized member name.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("control.") {
            Self::Control
        } else if name.starts_with("data.") {
            Self::Data
        } else if name == "_gpgbuilder" {
            Self::GpgBuilder
        } else if name == "debian-binary" {
            Self::DebianBinary
        } else {
            Self::Unrecognized
        }
    }
}

/// Normalize the name of an `ar` member.
///
/// GNU ar terminates names with `/` and some packagers embed a `./` or
/// directory prefix. Only the final path segment is retained.
pub fn normalize_member_name(name: &str) -> &str {
    let name = name.trim_end_matches('/');

    name.rsplit('/').next().unwrap_or(name)
}

/// A member of the outer `ar` archive.
#[derive(Clone, Debug)]
pub struct ArMember {
    /// Normalized member name.
    pub name: String,
    /// Member name as stored in the archive.
    pub original_name: String,
    /// Raw member content.
    pub data: Vec<u8>,
    pub kind: ArMemberKind,
}

impl ArMember {
    /// Member content as text with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> String {
        String::from_utf8_lossy(&self.data).trim().to_string()
    }
}

/// A reader of the members of a .deb file.
pub struct BinaryPackageReader<R: Read> {
    archive: ar::Archive<R>,
}

impl<R: Read> BinaryPackageReader<R> {
    /// Construct a new instance from a reader.
    pub fn new(reader: R) -> Self {
        Self {
            archive: ar::Archive::new(reader),
        }
    }

    /// Obtain the next member of the underlying ar archive.
    ///
    /// Member content is buffered in memory.
    pub fn next_member(&mut self) -> Option<Result<ArMember>> {
        let mut entry = match self.archive.next_entry()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(DebInspectError::ArchiveRead(e))),
        };

        // Member names should be ASCII. A lossy conversion is fine.
        let original_name = String::from_utf8_lossy(entry.header().identifier()).to_string();
        let name = normalize_member_name(&original_name).to_string();

        let mut data = vec![];
        if let Err(e) = entry.read_to_end(&mut data) {
            return Some(Err(DebInspectError::ArchiveRead(e)));
        }

        Some(Ok(ArMember {
            kind: ArMemberKind::from_name(&name),
            name,
            original_name,
            data,
        }))
    }
}

impl<R: Read> Iterator for BinaryPackageReader<R> {
    type Item = Result<ArMember>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_member()
    }
}
