// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Broad classification of a [DebInspectError].
///
/// Callers processing many packages use this to decide whether a failure
/// is worth retrying or should simply be recorded against a single package.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Invalid options. Raised before any package is read.
    Configuration,
    /// Local I/O failure.
    Io,
    /// Network failure while fetching a package.
    Network,
    /// The package content is malformed.
    Format,
}

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum DebInspectError {
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHash(String),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("URL error: {0:?}")]
    Url(#[from] url::ParseError),

    #[cfg(feature = "http")]
    #[error("HTTP error fetching {0}: {1:?}")]
    Http(String, reqwest::Error),

    #[error("HTTP support is not enabled; cannot fetch {0}")]
    HttpUnsupported(String),

    #[error("error reading ar archive: {0:?}")]
    ArchiveRead(std::io::Error),

    #[error("unknown compression in deb archive member: {0}")]
    UnknownCompression(String),

    #[error("error decompressing deb archive member {0}: {1:?}")]
    Decompression(String, std::io::Error),

    #[error("error reading tar archive in deb member {0}: {1:?}")]
    TarRead(String, std::io::Error),

    #[error("package checksum unavailable: package was not read from a path or memory")]
    PackageChecksumUnavailable,
}

impl DebInspectError {
    /// Obtain the [ErrorCategory] of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedHash(_) | Self::HttpUnsupported(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::IoPath(_, _) | Self::PackageChecksumUnavailable => {
                ErrorCategory::Io
            }
            Self::Url(_) => ErrorCategory::Configuration,
            #[cfg(feature = "http")]
            Self::Http(_, _) => ErrorCategory::Network,
            Self::ArchiveRead(_)
            | Self::UnknownCompression(_)
            | Self::Decompression(_, _)
            | Self::TarRead(_, _) => ErrorCategory::Format,
        }
    }

    /// Whether retrying the failed operation could plausibly succeed.
    ///
    /// Only network failures are retryable. A missing local file or a corrupt
    /// package will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, DebInspectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            DebInspectError::UnsupportedHash("crc32".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            DebInspectError::IoPath(
                "/nonexistent".into(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing")
            )
            .category(),
            ErrorCategory::Io
        );
        assert_eq!(
            DebInspectError::UnknownCompression("data.tar.rar".into()).category(),
            ErrorCategory::Format
        );
        assert!(!DebInspectError::UnknownCompression("x".into()).is_retryable());
    }
}
