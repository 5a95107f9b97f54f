// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Opening packages from local paths and URLs. */

use {
    crate::{
        checksum::PackageChecksum,
        deb::reader::PackageReader,
        error::{DebInspectError, Result},
        options::PackageOptions,
        package::{PackageFile, PackageOrigin},
    },
    chrono::{DateTime, TimeZone, Utc},
    slog::debug,
    std::{io::BufReader, path::Path},
    url::Url,
};

/// Parse an RFC 2822 date, as found in HTTP `Last-Modified` headers.
///
/// Returns [None] if the value can't be parsed.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let secs = mailparse::dateparse(value).ok()?;

    Utc.timestamp_opt(secs, 0).single()
}

/// Whether a URI refers to a remote package.
fn remote_url(uri: &str) -> Option<Url> {
    match Url::parse(uri) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => None,
    }
}

/// Open a package from a local path or an `http(s)://` URL.
pub fn open_package(uri: &str, options: &PackageOptions) -> Result<PackageFile> {
    if let Some(url) = remote_url(uri) {
        open_url(&url, options)
    } else {
        open_path(uri, options)
    }
}

/// Open a package from a local filesystem path.
///
/// The package checksum re-reads the file when first requested.
pub fn open_path(path: impl AsRef<Path>, options: &PackageOptions) -> Result<PackageFile> {
    let path = path.as_ref();
    let map_err = |e| DebInspectError::IoPath(format!("{}", path.display()), e);

    debug!(options.logger, "opening {}", path.display());

    let fh = std::fs::File::open(path).map_err(map_err)?;
    let metadata = fh.metadata().map_err(map_err)?;

    let mut package = PackageReader::new(BufReader::new(fh), options).read()?;

    package.set_archive(
        PackageOrigin::Path(path.to_path_buf()),
        Some(metadata.len()),
        metadata.modified().ok().map(DateTime::<Utc>::from),
        PackageChecksum::from_path(path),
    );

    Ok(package)
}

/// Obtain an HTTP client, taking proxy environment variables into account.
#[cfg(feature = "http")]
fn get_http_client() -> reqwest::Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::ClientBuilder::new();

    for (key, value) in std::env::vars() {
        let key = key.to_lowercase();
        if let Some(schema) = key.strip_suffix("_proxy") {
            if let Ok(url) = Url::parse(&value) {
                if let Some(Ok(proxy)) = match schema {
                    "http" => Some(reqwest::Proxy::http(url.as_str())),
                    "https" => Some(reqwest::Proxy::https(url.as_str())),
                    _ => None,
                } {
                    builder = builder.proxy(proxy);
                }
            }
        }
    }

    builder.build()
}

/// Fetch and open a package over HTTP.
///
/// The whole package is held in memory so its checksum can be computed later.
#[cfg(feature = "http")]
pub fn open_url(url: &Url, options: &PackageOptions) -> Result<PackageFile> {
    let map_err = |e| DebInspectError::Http(url.to_string(), e);

    debug!(options.logger, "fetching {}", url);

    let client = get_http_client().map_err(map_err)?;
    let response = client
        .get(url.clone())
        .send()
        .and_then(|res| res.error_for_status())
        .map_err(map_err)?;

    let content_length = response.content_length();
    let modified = response
        .headers()
        .get(reqwest::header::LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);

    let data = std::sync::Arc::new(response.bytes().map_err(map_err)?.to_vec());

    let mut package =
        PackageReader::new(std::io::Cursor::new(data.as_slice()), options).read()?;

    package.set_archive(
        PackageOrigin::Url(url.clone()),
        Some(content_length.unwrap_or(data.len() as u64)),
        modified,
        PackageChecksum::from_data(data.clone()),
    );

    Ok(package)
}

/// Fetch and open a package over HTTP.
///
/// Always fails: this build lacks HTTP support.
#[cfg(not(feature = "http"))]
pub fn open_url(url: &Url, _options: &PackageOptions) -> Result<PackageFile> {
    Err(DebInspectError::HttpUnsupported(url.to_string()))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{io::Compression, testutil::sample_deb},
        std::io::Write,
    };

    #[test]
    fn uri_dispatch() {
        assert!(remote_url("http://deb.debian.org/pool/main/z/zlib/zlib1g.deb").is_some());
        assert!(remote_url("HTTPS://example.com/foo.deb").is_some());
        assert!(remote_url("ftp://example.com/foo.deb").is_none());
        assert!(remote_url("/var/cache/apt/archives/foo.deb").is_none());
        assert!(remote_url("foo.deb").is_none());
    }

    #[test]
    fn http_dates() {
        assert_eq!(
            parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").map(|t| t.timestamp()),
            Some(1445412480)
        );
        assert_eq!(parse_http_date("not a date"), None);
    }

    #[test]
    fn missing_path() {
        let res = open_package("/nonexistent/path/to/package.deb", &PackageOptions::default());

        assert!(matches!(
            res,
            Err(DebInspectError::IoPath(path, _)) if path == "/nonexistent/path/to/package.deb"
        ));
    }

    #[test]
    fn local_path() -> Result<()> {
        let data = sample_deb(Compression::Gzip);

        let mut fh = tempfile::NamedTempFile::new()?;
        fh.write_all(&data)?;
        fh.flush()?;

        let package = open_package(&fh.path().display().to_string(), &PackageOptions::default())?;

        assert_eq!(package.origin(), &PackageOrigin::Path(fh.path().to_path_buf()));
        assert_eq!(package.path(), Some(fh.path().display().to_string()));
        assert_eq!(package.size(), Some(data.len() as u64));
        assert!(package.modified().is_some());
        assert_eq!(package.control().package(), Some("hello"));
        assert_eq!(
            package.package_checksum().sha256()?,
            crate::checksum::ChecksumType::Sha256.hex_digest(&data)
        );

        Ok(())
    }
}
