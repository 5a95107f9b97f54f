// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Declared and calculated checksums of package content.

Debian packages ship an `md5sums` file in `control.tar` listing the MD5 of
installed files. These are the *declared* checksums. They are keyed by paths
without the leading `./` and notoriously omit configuration files.

*Calculated* checksums are computed by us from the content of `data.tar`
and are keyed by the entry path exactly as it appears in the tar archive,
which almost always carries a leading `./`. The two stores are kept apart.
*/

use {
    crate::error::{DebInspectError, Result},
    digest::DynDigest,
    once_cell::sync::{Lazy, OnceCell},
    regex::Regex,
    slog::debug,
    std::{
        collections::HashMap,
        fmt::{Display, Formatter},
        io::Read,
        path::{Path, PathBuf},
        str::FromStr,
        sync::Arc,
    },
};

/// Length of a hex encoded MD5 digest.
const MD5_HEX_LENGTH: usize = 32;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s\t]+").expect("whitespace regular expression should compile")
});

/// A supported checksum flavor.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ChecksumType {
    /// MD5.
    Md5,

    /// SHA-1.
    Sha1,

    /// SHA-256.
    Sha256,
}

impl Default for ChecksumType {
    fn default() -> Self {
        Self::Md5
    }
}

impl Display for ChecksumType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumType {
    type Err = DebInspectError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(DebInspectError::UnsupportedHash(s.to_string())),
        }
    }
}

impl ChecksumType {
    /// All variants.
    pub fn all() -> impl Iterator<Item = ChecksumType> {
        [Self::Md5, Self::Sha1, Self::Sha256].into_iter()
    }

    /// Canonical lowercase name of this checksum flavor.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Length in characters of a hex encoded digest of this flavor.
    pub fn hex_length(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// Obtain a new hasher for this checksum flavor.
    pub fn new_hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Md5 => Box::new(md5::Md5::default()),
            Self::Sha1 => Box::new(sha1::Sha1::default()),
            Self::Sha256 => Box::new(sha2::Sha256::default()),
        }
    }

    /// Compute the hex encoded digest of in-memory data.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        let mut hasher = self.new_hasher();
        hasher.update(data);

        hex::encode(hasher.finalize())
    }

    /// Compute the hex encoded digest of everything a reader emits.
    pub fn hex_digest_reader(&self, reader: &mut impl Read) -> std::io::Result<String> {
        let mut hasher = self.new_hasher();
        let mut buffer = [0; 32768];

        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }

            hasher.update(&buffer[0..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

/// Normalize a path to the key convention of the declared checksums store.
pub fn declared_key(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Parse an `md5sums` line into its `(path, digest)` pair.
///
/// Runs of whitespace are collapsed. The line must then consist of exactly
/// a digest and a path, and the digest must be as long as a hex MD5.
/// The returned path has its leading `./` removed.
pub fn parse_md5sums_line(line: &str) -> Option<(String, String)> {
    let collapsed = WHITESPACE_RUN.replace_all(line, " ");
    let parts = collapsed.split(' ').collect::<Vec<_>>();

    match parts.as_slice() {
        [digest, path] if digest.len() == MD5_HEX_LENGTH => {
            Some((declared_key(path).to_string(), digest.to_string()))
        }
        _ => None,
    }
}

/// A file whose declared checksum does not agree with its content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChecksumMismatch {
    /// Path of the file, in the declared checksums key convention.
    pub path: String,

    /// MD5 from the `md5sums` file.
    pub declared: String,

    /// MD5 of the content in `data.tar`.
    ///
    /// [None] if the file isn't present as a regular file in `data.tar`.
    pub calculated: Option<String>,
}

/// Per-file checksums of a package.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileChecksums {
    declared: HashMap<String, String>,
    calculated: HashMap<String, String>,
    calculated_type: ChecksumType,
}

impl FileChecksums {
    /// Construct an empty instance recording calculated checksums of the given flavor.
    pub fn new(calculated_type: ChecksumType) -> Self {
        Self {
            calculated_type,
            ..Default::default()
        }
    }

    /// Ingest the content of an `md5sums` file into the declared store.
    ///
    /// Malformed lines are skipped. Returns the number of lines that were skipped.
    pub fn parse_md5sums(&mut self, logger: &slog::Logger, data: &[u8]) -> usize {
        let text = String::from_utf8_lossy(data);
        let mut skipped = 0;

        for line in text.lines() {
            if let Some((path, digest)) = parse_md5sums_line(line) {
                self.declared.insert(path, digest);
            } else {
                debug!(logger, "ignoring malformed md5sums line: {:?}", line);
                skipped += 1;
            }
        }

        skipped
    }

    /// Record the calculated checksum of a file, keyed by its verbatim tar path.
    ///
    /// Empty digests are ignored.
    pub fn set_calculated(&mut self, path: impl ToString, digest: String) {
        if !digest.is_empty() {
            self.calculated.insert(path.to_string(), digest);
        }
    }

    /// The flavor of calculated checksums.
    pub fn calculated_type(&self) -> ChecksumType {
        self.calculated_type
    }

    /// Obtain the declared MD5 of a path.
    ///
    /// A leading `./` on `path` is ignored.
    pub fn declared(&self, path: &str) -> Option<&str> {
        self.declared.get(declared_key(path)).map(|x| x.as_str())
    }

    /// Obtain the calculated checksum of a path.
    ///
    /// `path` must match the tar entry path exactly, typically including its leading `./`.
    pub fn calculated(&self, path: &str) -> Option<&str> {
        self.calculated.get(path).map(|x| x.as_str())
    }

    /// Iterate over `(path, md5)` pairs in the declared store.
    pub fn iter_declared(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declared.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over `(path, digest)` pairs in the calculated store.
    pub fn iter_calculated(&self) -> impl Iterator<Item = (&str, &str)> {
        self.calculated.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of declared checksums.
    pub fn declared_len(&self) -> usize {
        self.declared.len()
    }

    /// Number of calculated checksums.
    pub fn calculated_len(&self) -> usize {
        self.calculated.len()
    }

    /// Compare declared checksums against MD5s computed from package content.
    ///
    /// `content_md5` maps declared-convention paths to the MD5 of their content.
    /// Results are sorted by path.
    pub fn reconcile(&self, content_md5: &HashMap<String, String>) -> Vec<ChecksumMismatch> {
        let mut mismatches = self
            .declared
            .iter()
            .filter_map(|(path, declared)| match content_md5.get(path) {
                Some(calculated) if calculated.eq_ignore_ascii_case(declared) => None,
                calculated => Some(ChecksumMismatch {
                    path: path.clone(),
                    declared: declared.clone(),
                    calculated: calculated.cloned(),
                }),
            })
            .collect::<Vec<_>>();

        mismatches.sort_by(|a, b| a.path.cmp(&b.path));

        mismatches
    }
}

/// Where the bytes of a whole package archive can be obtained from.
#[derive(Clone, Debug)]
enum ChecksumSource {
    Path(PathBuf),
    Memory(Arc<Vec<u8>>),
    Unavailable,
}

/// Lazily computed checksums of an entire package archive.
///
/// Each flavor is computed on first access and cached afterwards.
#[derive(Debug)]
pub struct PackageChecksum {
    source: ChecksumSource,
    md5: OnceCell<String>,
    sha1: OnceCell<String>,
    sha256: OnceCell<String>,
}

impl PackageChecksum {
    fn new(source: ChecksumSource) -> Self {
        Self {
            source,
            md5: OnceCell::new(),
            sha1: OnceCell::new(),
            sha256: OnceCell::new(),
        }
    }

    /// Checksums that re-read the archive from a filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(ChecksumSource::Path(path.as_ref().to_path_buf()))
    }

    /// Checksums over an in-memory copy of the archive.
    pub fn from_data(data: Arc<Vec<u8>>) -> Self {
        Self::new(ChecksumSource::Memory(data))
    }

    /// Checksums for an archive whose bytes were not retained.
    pub fn unavailable() -> Self {
        Self::new(ChecksumSource::Unavailable)
    }

    fn compute(&self, checksum: ChecksumType) -> Result<String> {
        match &self.source {
            ChecksumSource::Memory(data) => Ok(checksum.hex_digest(data)),
            ChecksumSource::Path(path) => {
                let mut fh = std::fs::File::open(path)
                    .map_err(|e| DebInspectError::IoPath(format!("{}", path.display()), e))?;

                checksum
                    .hex_digest_reader(&mut fh)
                    .map_err(|e| DebInspectError::IoPath(format!("{}", path.display()), e))
            }
            ChecksumSource::Unavailable => Err(DebInspectError::PackageChecksumUnavailable),
        }
    }

    /// Obtain the hex digest of the archive for a given flavor.
    pub fn digest(&self, checksum: ChecksumType) -> Result<&str> {
        let cell = match checksum {
            ChecksumType::Md5 => &self.md5,
            ChecksumType::Sha1 => &self.sha1,
            ChecksumType::Sha256 => &self.sha256,
        };

        cell.get_or_try_init(|| self.compute(checksum))
            .map(|x| x.as_str())
    }

    /// MD5 of the archive.
    pub fn md5(&self) -> Result<&str> {
        self.digest(ChecksumType::Md5)
    }

    /// SHA-1 of the archive.
    pub fn sha1(&self) -> Result<&str> {
        self.digest(ChecksumType::Sha1)
    }

    /// SHA-256 of the archive.
    pub fn sha256(&self) -> Result<&str> {
        self.digest(ChecksumType::Sha256)
    }
}
