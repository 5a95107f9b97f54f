// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading of `control.tar` members. */

use {
    crate::error::{DebInspectError, Result},
    std::io::{Cursor, Read},
};

/// The role of a file in `control.tar`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ControlTarFile {
    /// The `control` file.
    Control,
    /// The `md5sums` file.
    Md5sums,
    /// The `conffiles` file.
    Conffiles,
    /// The `triggers` file.
    Triggers,
    /// The `shlibs` file.
    Shlibs,
    /// The `symbols` file.
    Symbols,
    /// The `preinst` file.
    Preinst,
    /// The `postinst` file.
    Postinst,
    /// The `prerm` file.
    Prerm,
    /// The `postrm` file.
    Postrm,
    /// The debconf `templates` file. Not interpreted.
    Templates,
    /// The debconf `config` script. Not interpreted.
    Config,
    /// An unclassified file, holding its path.
    Other(String),
}

impl From<&str> for ControlTarFile {
    fn from(path: &str) -> Self {
        match path.trim_start_matches("./") {
            "control" => Self::Control,
            "md5sums" => Self::Md5sums,
            "conffiles" => Self::Conffiles,
            "triggers" => Self::Triggers,
            "shlibs" => Self::Shlibs,
            "symbols" => Self::Symbols,
            "preinst" => Self::Preinst,
            "postinst" => Self::Postinst,
            "prerm" => Self::Prerm,
            "postrm" => Self::Postrm,
            "templates" => Self::Templates,
            "config" => Self::Config,
            _ => Self::Other(path.to_string()),
        }
    }
}

/// A regular file read from `control.tar`.
#[derive(Clone, Debug)]
pub struct ControlTarEntry {
    /// Path as stored in the archive.
    pub path: String,
    pub file: ControlTarFile,
    pub data: Vec<u8>,
}

/// Read all regular files from a decompressed `control.tar`.
///
/// Directories, links and other special entries are skipped. `member` names the
/// ar member the tar came from and is used for error reporting.
pub fn read_control_tar(member: &str, tar_data: &[u8]) -> Result<Vec<ControlTarEntry>> {
    let map_err = |e| DebInspectError::TarRead(member.to_string(), e);

    let mut archive = tar::Archive::new(Cursor::new(tar_data));
    let mut res = vec![];

    for entry in archive.entries().map_err(map_err)? {
        let mut entry = entry.map_err(map_err)?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = String::from_utf8_lossy(&entry.path_bytes()).to_string();

        let mut data = vec![];
        entry.read_to_end(&mut data).map_err(map_err)?;

        res.push(ControlTarEntry {
            file: ControlTarFile::from(path.as_str()),
            path,
            data,
        });
    }

    Ok(res)
}
