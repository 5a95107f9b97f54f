// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian binary package inspection.

This crate reads Debian binary packages (`.deb` files, as well as the closely
related OpenWrt `.ipk` files) and extracts their metadata: control fields,
maintainer scripts, auxiliary descriptor files, the inventory of installed
files and checksums.

The canonical home of this crate is <https://github.com/indygreg/PyOxidizer>. Please file issues
and pull requests there.

# A Tour of Functionality

[acquire::open_package()] opens a package from a local path or an `http(s)://`
URL and returns a [package::PackageFile]. In-memory archives can be read with
[package::PackageFile::from_data()] and arbitrary streams with
[package::PackageFile::from_reader()].

How packages are read is controlled by [options::PackageOptions]. e.g. setting
[options::PackageOptions::meta_only] skips reading file content, which is much
faster on large packages.

```no_run
use deb_inspect::{acquire::open_package, options::PackageOptions};

let package = open_package("zlib1g_1.2.11.dfsg-2_amd64.deb", &PackageOptions::default())?;

println!("{:?}", package.control().version());
for file in package.files() {
    println!("{} {}", file.path, file.size);
}
# Ok::<(), deb_inspect::error::DebInspectError>(())
```

The outer `ar` archive is handled by the [deb] module. Its members are decompressed
by [io::Compression], which supports gzip, xz, bzip2, legacy lzma and zstd.

The `control` file is parsed by [control::ControlTextParser] into
[control::ControlFields]. The `conffiles`, `triggers`, `shlibs` and `symbols` files
are parsed by types in the [descriptor] module.

Checksums live in the [checksum] module. [checksum::FileChecksums] holds the
*declared* MD5s from the package's `md5sums` file as well as *calculated* checksums
of the content in `data.tar`. When [options::PackageOptions::recalculate_checksums]
is set, the two are compared and disagreements are reported by
[package::PackageFile::checksum_mismatches()]. Checksums of the package archive
itself are computed lazily by [checksum::PackageChecksum].

# Crate Features

The `http` feature (enabled by default) enables fetching packages over HTTP
via `reqwest`.
*/

pub mod acquire;
pub mod checksum;
pub mod control;
pub mod deb;
pub mod descriptor;
pub mod error;
pub mod io;
pub mod options;
pub mod package;
#[cfg(test)]
mod testutil;
