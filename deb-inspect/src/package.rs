// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The result of reading a binary package. */

use {
    crate::{
        checksum::{ChecksumMismatch, ChecksumType, FileChecksums, PackageChecksum},
        control::ControlFields,
        deb::reader::PackageReader,
        descriptor::{ConffilesFile, SharedLibsFile, SymbolsFile, TriggersFile},
        error::Result,
        options::PackageOptions,
    },
    chrono::{DateTime, TimeZone, Utc},
    std::{
        fmt::{Display, Formatter},
        io::{Cursor, Read},
        path::PathBuf,
        sync::Arc,
    },
};

/// The type of an entry in `data.tar`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileType {
    Regular,
    HardLink,
    Symlink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    /// Any other tar entry type, holding its raw type flag.
    Other(u8),
}

impl From<tar::EntryType> for FileType {
    fn from(entry_type: tar::EntryType) -> Self {
        match entry_type.as_byte() {
            b'0' | b'\0' | b'7' => Self::Regular,
            b'1' => Self::HardLink,
            b'2' => Self::Symlink,
            b'3' => Self::CharDevice,
            b'4' => Self::BlockDevice,
            b'5' => Self::Directory,
            b'6' => Self::Fifo,
            other => Self::Other(other),
        }
    }
}

/// Metadata of an entry in a package's `data.tar`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileRecord {
    /// Path as stored in the tar archive. Usually begins with `./`.
    pub path: String,
    /// Permission bits as stored in the tar header.
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
    /// Modification time in seconds since the UNIX epoch.
    pub mtime: u64,
    /// Owner user name. Empty if not recorded.
    pub owner: String,
    /// Owner group name. Empty if not recorded.
    pub group: String,
    /// Target of a symbolic or hard link.
    pub link_target: Option<String>,
    pub file_type: FileType,
}

impl FileRecord {
    /// Whether this is a regular file.
    pub fn is_regular(&self) -> bool {
        self.file_type == FileType::Regular
    }

    /// Modification time as a [DateTime].
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.mtime)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// Maintainer scripts of a package.
///
/// Scripts not present in the package are empty strings.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MaintainerScripts {
    pub preinst: String,
    pub postinst: String,
    pub prerm: String,
    pub postrm: String,
}

/// Where a package was read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PackageOrigin {
    /// A local filesystem path.
    Path(PathBuf),
    /// An HTTP(S) URL.
    Url(url::Url),
    /// A buffer in memory.
    Memory,
    /// An arbitrary reader.
    Stream,
}

impl Display for PackageOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
            Self::Memory => f.write_str("<memory>"),
            Self::Stream => f.write_str("<stream>"),
        }
    }
}

/// A parsed binary package.
///
/// Instances are produced by a single read of a `.deb` archive and are
/// immutable afterwards. They can be shared across threads.
#[derive(Debug)]
pub struct PackageFile {
    pub(crate) origin: PackageOrigin,
    pub(crate) size: Option<u64>,
    pub(crate) modified: Option<DateTime<Utc>>,
    pub(crate) deb_version: String,
    pub(crate) gpg_builder: String,
    pub(crate) scripts: MaintainerScripts,
    pub(crate) control: ControlFields,
    pub(crate) symbols: SymbolsFile,
    pub(crate) shlibs: SharedLibsFile,
    pub(crate) triggers: TriggersFile,
    pub(crate) conffiles: ConffilesFile,
    pub(crate) files: Vec<FileRecord>,
    pub(crate) checksums: FileChecksums,
    pub(crate) mismatches: Vec<ChecksumMismatch>,
    pub(crate) package_checksum: PackageChecksum,
}

impl PartialEq for PackageFile {
    /// Compares everything except the lazily computed package checksum.
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.size == other.size
            && self.modified == other.modified
            && self.deb_version == other.deb_version
            && self.gpg_builder == other.gpg_builder
            && self.scripts == other.scripts
            && self.control == other.control
            && self.symbols == other.symbols
            && self.shlibs == other.shlibs
            && self.triggers == other.triggers
            && self.conffiles == other.conffiles
            && self.files == other.files
            && self.checksums == other.checksums
            && self.mismatches == other.mismatches
    }
}

impl PackageFile {
    pub(crate) fn new(hash: ChecksumType) -> Self {
        Self {
            origin: PackageOrigin::Stream,
            size: None,
            modified: None,
            deb_version: String::new(),
            gpg_builder: String::new(),
            scripts: MaintainerScripts::default(),
            control: ControlFields::default(),
            symbols: SymbolsFile::default(),
            shlibs: SharedLibsFile::default(),
            triggers: TriggersFile::default(),
            conffiles: ConffilesFile::default(),
            files: vec![],
            checksums: FileChecksums::new(hash),
            mismatches: vec![],
            package_checksum: PackageChecksum::unavailable(),
        }
    }

    /// Record where the archive came from.
    pub(crate) fn set_archive(
        &mut self,
        origin: PackageOrigin,
        size: Option<u64>,
        modified: Option<DateTime<Utc>>,
        package_checksum: PackageChecksum,
    ) {
        self.origin = origin;
        self.size = size;
        self.modified = modified;
        self.package_checksum = package_checksum;
    }

    /// Read a package from an arbitrary reader.
    ///
    /// The package archive bytes are not retained, so [Self::package_checksum()]
    /// is unavailable.
    pub fn from_reader(reader: impl Read, options: &PackageOptions) -> Result<Self> {
        PackageReader::new(reader, options).read()
    }

    /// Read a package from an in-memory `.deb` archive.
    pub fn from_data(data: Vec<u8>, options: &PackageOptions) -> Result<Self> {
        let data = Arc::new(data);
        let mut package = PackageReader::new(Cursor::new(data.as_slice()), options).read()?;

        package.set_archive(
            PackageOrigin::Memory,
            Some(data.len() as u64),
            None,
            PackageChecksum::from_data(data.clone()),
        );

        Ok(package)
    }

    /// Where this package was read from.
    pub fn origin(&self) -> &PackageOrigin {
        &self.origin
    }

    /// The path or URL this package was opened from, if any.
    pub fn path(&self) -> Option<String> {
        match &self.origin {
            PackageOrigin::Path(_) | PackageOrigin::Url(_) => Some(self.origin.to_string()),
            PackageOrigin::Memory | PackageOrigin::Stream => None,
        }
    }

    /// Size in bytes of the package archive, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Last modification time of the package archive, if known.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// Version of the `.deb` format, from the `debian-binary` member. e.g. `2.0`.
    pub fn deb_version(&self) -> &str {
        &self.deb_version
    }

    /// Content of the `_gpgbuilder` member, if present.
    pub fn gpg_builder(&self) -> &str {
        &self.gpg_builder
    }

    /// Maintainer scripts.
    pub fn scripts(&self) -> &MaintainerScripts {
        &self.scripts
    }

    /// The `preinst` maintainer script.
    pub fn preinst(&self) -> &str {
        &self.scripts.preinst
    }

    /// The `postinst` maintainer script.
    pub fn postinst(&self) -> &str {
        &self.scripts.postinst
    }

    /// The `prerm` maintainer script.
    pub fn prerm(&self) -> &str {
        &self.scripts.prerm
    }

    /// The `postrm` maintainer script.
    pub fn postrm(&self) -> &str {
        &self.scripts.postrm
    }

    /// Fields of the `control` file.
    pub fn control(&self) -> &ControlFields {
        &self.control
    }

    /// The parsed `symbols` file.
    pub fn symbols(&self) -> &SymbolsFile {
        &self.symbols
    }

    /// The parsed `shlibs` file.
    pub fn shlibs(&self) -> &SharedLibsFile {
        &self.shlibs
    }

    /// The parsed `triggers` file.
    pub fn triggers(&self) -> &TriggersFile {
        &self.triggers
    }

    /// The parsed `conffiles` file.
    pub fn conffiles(&self) -> &ConffilesFile {
        &self.conffiles
    }

    /// All entries of `data.tar`, in archive order.
    ///
    /// Duplicate paths are retained.
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Obtain the entry for a path in `data.tar`.
    ///
    /// `path` must match the tar path exactly. If the path occurs multiple times,
    /// the last occurrence wins.
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.iter().rev().find(|f| f.path == path)
    }

    /// All per-file checksums.
    pub fn checksums(&self) -> &FileChecksums {
        &self.checksums
    }

    /// MD5 of a file as declared by the package's `md5sums` file.
    ///
    /// Paths are accepted with or without their leading `./`.
    pub fn declared_md5(&self, path: &str) -> Option<&str> {
        self.checksums.declared(path)
    }

    /// Checksum of a file computed from `data.tar` content.
    ///
    /// `path` must match the tar path exactly, typically including its leading `./`.
    pub fn calculated_checksum(&self, path: &str) -> Option<&str> {
        self.checksums.calculated(path)
    }

    /// Flavor of [Self::calculated_checksum()] values, as set by [PackageOptions::hash].
    pub fn options_hash(&self) -> ChecksumType {
        self.checksums.calculated_type()
    }

    /// Declared checksums that disagree with package content.
    ///
    /// Only populated when checksum reconciliation was enabled.
    pub fn checksum_mismatches(&self) -> &[ChecksumMismatch] {
        &self.mismatches
    }

    /// Checksums of the package archive itself.
    pub fn package_checksum(&self) -> &PackageChecksum {
        &self.package_checksum
    }
}
