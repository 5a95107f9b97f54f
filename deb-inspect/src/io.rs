// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers. */

use {
    crate::error::{DebInspectError, Result},
    std::io::{Cursor, Read},
};

/// Compression format of a `control.tar*` or `data.tar*` member.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Compression {
    /// No compression (no extension).
    None,

    /// Gzip compression (.gz extension).
    Gzip,

    /// XZ compression (.xz extension).
    Xz,

    /// Bzip2 compression (.bz2 extension).
    Bzip2,

    /// Legacy LZMA compression (.lzma extension).
    Lzma,

    /// Zstandard compression (.zst extension).
    Zstd,
}

impl Compression {
    /// Filename extension for files compressed in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Xz => ".xz",
            Self::Bzip2 => ".bz2",
            Self::Lzma => ".lzma",
            Self::Zstd => ".zst",
        }
    }

    /// Resolve the compression format from a filename extension.
    ///
    /// `extension` includes the leading `.`. An empty string means no compression.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "" => Some(Self::None),
            ".gz" => Some(Self::Gzip),
            ".xz" => Some(Self::Xz),
            ".bz2" => Some(Self::Bzip2),
            ".lzma" => Some(Self::Lzma),
            ".zst" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Resolve the compression format of a `control.tar*` or `data.tar*` member.
    ///
    /// Names not following the `<kind>.tar<ext>` layout, or having an extension
    /// we can't decode, are rejected.
    pub fn from_member_name(name: &str) -> Result<Self> {
        name.split_once(".tar")
            .and_then(|(_, extension)| Self::from_extension(extension))
            .ok_or_else(|| DebInspectError::UnknownCompression(name.to_string()))
    }

    /// Obtain a reader that decompresses `data`.
    pub fn decoder<'a>(&self, data: &'a [u8]) -> std::io::Result<Box<dyn Read + 'a>> {
        let cursor = Cursor::new(data);

        Ok(match self {
            Self::None => Box::new(cursor),
            Self::Gzip => Box::new(libflate::gzip::MultiDecoder::new(cursor)?),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(cursor)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(cursor)),
            Self::Lzma => {
                let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)?;
                Box::new(xz2::read::XzDecoder::new_stream(cursor, stream))
            }
            Self::Zstd => Box::new(zstd::Decoder::new(cursor)?),
        })
    }

    /// Fully decompress `data`, which came from the archive member `member`.
    ///
    /// The entire decompressed content is buffered in memory.
    pub fn decompress(&self, member: &str, data: &[u8]) -> Result<Vec<u8>> {
        if *self == Self::None {
            return Ok(data.to_vec());
        }

        let mut decoded = vec![];
        self.decoder(data)
            .and_then(|mut reader| reader.read_to_end(&mut decoded))
            .map_err(|e| DebInspectError::Decompression(member.to_string(), e))?;

        Ok(decoded)
    }
}

/// Decompress the payload of a `control.tar*` or `data.tar*` member.
///
/// The compression format is derived from the member name.
pub fn decompress_member(name: &str, data: &[u8]) -> Result<Vec<u8>> {
    Compression::from_member_name(name)?.decompress(name, data)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testutil::compress};

    const PAYLOAD: &[u8] = b"the quick brown fox jumps over the lazy dog\n";

    #[test]
    fn member_name_suffixes() -> Result<()> {
        assert_eq!(Compression::from_member_name("data.tar")?, Compression::None);
        assert_eq!(Compression::from_member_name("data.tar.gz")?, Compression::Gzip);
        assert_eq!(Compression::from_member_name("control.tar.xz")?, Compression::Xz);
        assert_eq!(Compression::from_member_name("data.tar.bz2")?, Compression::Bzip2);
        assert_eq!(Compression::from_member_name("data.tar.lzma")?, Compression::Lzma);
        assert_eq!(Compression::from_member_name("data.tar.zst")?, Compression::Zstd);

        for (name, extension) in [("data.tar.gz", ".gz"), ("control.tar", "")] {
            assert_eq!(
                Compression::from_member_name(name)?.extension(),
                extension
            );
        }

        Ok(())
    }

    #[test]
    fn unknown_suffix_rejected() {
        for name in ["data.tar.rar", "data.tgz", "data"] {
            assert!(matches!(
                Compression::from_member_name(name),
                Err(DebInspectError::UnknownCompression(n)) if n == name
            ));
        }
    }

    #[test]
    fn decompress_all_formats() -> Result<()> {
        for compression in [
            Compression::None,
            Compression::Gzip,
            Compression::Xz,
            Compression::Bzip2,
            Compression::Lzma,
            Compression::Zstd,
        ] {
            let name = format!("data.tar{}", compression.extension());
            let compressed = compress(compression, PAYLOAD);

            assert_eq!(
                decompress_member(&name, &compressed)?,
                PAYLOAD,
                "{:?} round trips",
                compression
            );
        }

        Ok(())
    }

    #[test]
    fn corrupt_payload_is_error() {
        for compression in [
            Compression::Gzip,
            Compression::Xz,
            Compression::Bzip2,
            Compression::Lzma,
            Compression::Zstd,
        ] {
            let name = format!("data.tar{}", compression.extension());

            let res = compression.decompress(&name, &[0xff; 64]);
            assert!(
                matches!(res, Err(DebInspectError::Decompression(ref n, _)) if *n == name),
                "{:?} rejects garbage",
                compression
            );
        }
    }

    #[test]
    fn truncated_payload_is_error() {
        let compressed = compress(Compression::Xz, PAYLOAD);

        assert!(matches!(
            Compression::Xz.decompress("data.tar.xz", &compressed[0..compressed.len() / 2]),
            Err(DebInspectError::Decompression(_, _))
        ));
    }
}
