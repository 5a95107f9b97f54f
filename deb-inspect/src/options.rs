// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Options controlling how packages are read. */

use {
    crate::{checksum::ChecksumType, error::Result},
    std::str::FromStr,
};

/// Options for reading a package.
///
/// Instances are constructed once and passed by reference into readers.
/// Use struct update syntax to override defaults:
///
/// ```
/// use deb_inspect::{checksum::ChecksumType, options::PackageOptions};
///
/// let options = PackageOptions {
///     hash: ChecksumType::Sha256,
///     ..Default::default()
/// };
/// assert!(!options.meta_only);
/// ```
#[derive(Clone, Debug)]
pub struct PackageOptions {
    /// Do not read file content in `data.tar`, only entry headers.
    ///
    /// The file inventory is still populated but no calculated checksums
    /// are recorded. This is much faster for large packages.
    pub meta_only: bool,

    /// Flavor of calculated per-file checksums.
    pub hash: ChecksumType,

    /// Compare declared `md5sums` entries against the content of `data.tar`.
    ///
    /// Has no effect when [Self::meta_only] is set.
    pub recalculate_checksums: bool,

    /// Receives diagnostics emitted while reading.
    pub logger: slog::Logger,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            meta_only: false,
            hash: ChecksumType::Md5,
            recalculate_checksums: true,
            logger: slog::Logger::root(slog::Discard, slog::o!()),
        }
    }
}

impl PackageOptions {
    /// Construct default options with a named calculated checksum flavor.
    ///
    /// Errors if the hash name is not supported.
    pub fn with_hash_name(hash: &str) -> Result<Self> {
        Ok(Self {
            hash: ChecksumType::from_str(hash)?,
            ..Default::default()
        })
    }

    /// Whether `data.tar` file content needs to be read.
    pub fn reads_content(&self) -> bool {
        !self.meta_only
    }

    /// Whether declared checksums are reconciled against package content.
    pub fn reconciles(&self) -> bool {
        !self.meta_only && self.recalculate_checksums
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::DebInspectError};

    #[test]
    fn defaults() {
        let options = PackageOptions::default();

        assert!(!options.meta_only);
        assert_eq!(options.hash, ChecksumType::Md5);
        assert!(options.recalculate_checksums);
        assert!(options.reads_content());
        assert!(options.reconciles());
    }

    #[test]
    fn meta_only_disables_reconciliation() {
        let options = PackageOptions {
            meta_only: true,
            ..Default::default()
        };

        assert!(!options.reads_content());
        assert!(!options.reconciles());
    }

    #[test]
    fn hash_name() -> Result<()> {
        assert_eq!(
            PackageOptions::with_hash_name("sha256")?.hash,
            ChecksumType::Sha256
        );

        assert!(matches!(
            PackageOptions::with_hash_name("whirlpool"),
            Err(DebInspectError::UnsupportedHash(_))
        ));

        Ok(())
    }
}
