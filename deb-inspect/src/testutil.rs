// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Test fixtures. */

use {
    crate::io::Compression,
    std::io::Write,
};

/// Modification time of every fixture archive member and tar entry.
pub const FIXTURE_MTIME: u64 = 1_600_000_000;

pub const HELLO_BINARY: &[u8] = b"\x7fELF pretend this is a program";
pub const HELLO_CONF: &[u8] = b"greeting = hello\n";
pub const HELLO_COPYRIGHT: &[u8] = b"Copyright: nobody\n";

pub fn discard_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

/// Compress a payload with the given format.
pub fn compress(compression: Compression, payload: &[u8]) -> Vec<u8> {
    match compression {
        Compression::None => payload.to_vec(),
        Compression::Gzip => {
            let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
            encoder.write_all(payload).unwrap();
            encoder.finish().into_result().unwrap()
        }
        Compression::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(payload).unwrap();
            encoder.finish().unwrap()
        }
        Compression::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(payload).unwrap();
            encoder.finish().unwrap()
        }
        Compression::Lzma => {
            let options = xz2::stream::LzmaOptions::new_preset(6).unwrap();
            let stream = xz2::stream::Stream::new_lzma_encoder(&options).unwrap();
            let mut encoder = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
            encoder.write_all(payload).unwrap();
            encoder.finish().unwrap()
        }
        Compression::Zstd => zstd::encode_all(payload, 0).unwrap(),
    }
}

enum DataEntry {
    File(String, Vec<u8>, u32),
    Directory(String),
    Symlink(String, String),
    HardLink(String, String),
}

/// Builds `.deb` archives in memory.
///
/// Tar paths are written verbatim so they retain their `./` prefix.
pub struct DebFixture {
    compression: Compression,
    member_prefix: String,
    debian_binary: Option<Vec<u8>>,
    gpg_builder: Option<Vec<u8>>,
    extra_members: Vec<(String, Vec<u8>)>,
    control_files: Vec<(String, Vec<u8>)>,
    data_entries: Vec<DataEntry>,
}

impl Default for DebFixture {
    fn default() -> Self {
        Self {
            compression: Compression::Gzip,
            member_prefix: String::new(),
            debian_binary: Some(b"2.0\n".to_vec()),
            gpg_builder: None,
            extra_members: vec![],
            control_files: vec![],
            data_entries: vec![],
        }
    }
}

impl DebFixture {
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Prefix prepended to every ar member name. IPK packagers use `./`.
    pub fn member_prefix(mut self, prefix: &str) -> Self {
        self.member_prefix = prefix.to_string();
        self
    }

    pub fn debian_binary(mut self, data: Option<&[u8]>) -> Self {
        self.debian_binary = data.map(|x| x.to_vec());
        self
    }

    pub fn gpg_builder(mut self, data: &[u8]) -> Self {
        self.gpg_builder = Some(data.to_vec());
        self
    }

    /// Add a raw ar member, written before `control.tar`.
    pub fn member(mut self, name: &str, data: &[u8]) -> Self {
        self.extra_members.push((name.to_string(), data.to_vec()));
        self
    }

    /// Add a file to `control.tar`. `name` is written with a `./` prefix.
    pub fn control_file(mut self, name: &str, data: &[u8]) -> Self {
        self.control_files.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn data_file(self, path: &str, data: &[u8]) -> Self {
        self.data_file_mode(path, data, 0o644)
    }

    pub fn data_file_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        self.data_entries
            .push(DataEntry::File(path.to_string(), data.to_vec(), mode));
        self
    }

    pub fn data_directory(mut self, path: &str) -> Self {
        self.data_entries.push(DataEntry::Directory(path.to_string()));
        self
    }

    pub fn data_symlink(mut self, path: &str, target: &str) -> Self {
        self.data_entries
            .push(DataEntry::Symlink(path.to_string(), target.to_string()));
        self
    }

    pub fn data_hardlink(mut self, path: &str, target: &str) -> Self {
        self.data_entries
            .push(DataEntry::HardLink(path.to_string(), target.to_string()));
        self
    }

    /// Uncompressed `control.tar` bytes.
    pub fn control_tar_bytes(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        append_tar(&mut builder, "./", tar::EntryType::Directory, 0o755, &[], None);
        for (name, data) in &self.control_files {
            let mode = if is_script(name) { 0o755 } else { 0o644 };
            append_tar(
                &mut builder,
                &format!("./{}", name),
                tar::EntryType::Regular,
                mode,
                data,
                None,
            );
        }

        builder.into_inner().unwrap()
    }

    /// Uncompressed `data.tar` bytes.
    pub fn data_tar_bytes(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        for entry in &self.data_entries {
            match entry {
                DataEntry::File(path, data, mode) => {
                    append_tar(&mut builder, path, tar::EntryType::Regular, *mode, data, None)
                }
                DataEntry::Directory(path) => {
                    append_tar(&mut builder, path, tar::EntryType::Directory, 0o755, &[], None)
                }
                DataEntry::Symlink(path, target) => append_tar(
                    &mut builder,
                    path,
                    tar::EntryType::Symlink,
                    0o777,
                    &[],
                    Some(target),
                ),
                DataEntry::HardLink(path, target) => append_tar(
                    &mut builder,
                    path,
                    tar::EntryType::Link,
                    0o644,
                    &[],
                    Some(target),
                ),
            }
        }

        builder.into_inner().unwrap()
    }

    /// Produce the `.deb` archive bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut builder = ar::Builder::new(Vec::new());

        if let Some(data) = &self.debian_binary {
            append_ar(&mut builder, &format!("{}debian-binary", self.member_prefix), data);
        }

        for (name, data) in &self.extra_members {
            append_ar(&mut builder, name, data);
        }

        append_ar(
            &mut builder,
            &format!(
                "{}control.tar{}",
                self.member_prefix,
                self.compression.extension()
            ),
            &compress(self.compression, &self.control_tar_bytes()),
        );
        append_ar(
            &mut builder,
            &format!(
                "{}data.tar{}",
                self.member_prefix,
                self.compression.extension()
            ),
            &compress(self.compression, &self.data_tar_bytes()),
        );

        if let Some(data) = &self.gpg_builder {
            append_ar(&mut builder, &format!("{}_gpgbuilder", self.member_prefix), data);
        }

        builder.into_inner().unwrap()
    }
}

fn is_script(name: &str) -> bool {
    matches!(name, "preinst" | "postinst" | "prerm" | "postrm")
}

fn append_ar(builder: &mut ar::Builder<Vec<u8>>, name: &str, data: &[u8]) {
    let mut header = ar::Header::new(name.as_bytes().to_vec(), data.len() as _);
    header.set_mode(0o644);
    header.set_mtime(FIXTURE_MTIME);
    header.set_uid(0);
    header.set_gid(0);
    builder.append(&header, data).unwrap();
}

fn append_tar(
    builder: &mut tar::Builder<Vec<u8>>,
    path: &str,
    entry_type: tar::EntryType,
    mode: u32,
    data: &[u8],
    link: Option<&str>,
) {
    let mut header = tar::Header::new_gnu();

    // `set_path()` would normalize away the leading `./`.
    let name_buffer = &mut header.as_old_mut().name;
    assert!(path.len() <= name_buffer.len());
    name_buffer[..path.len()].copy_from_slice(path.as_bytes());

    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root").unwrap();
    header.set_groupname("root").unwrap();
    header.set_mtime(FIXTURE_MTIME);
    header.set_size(data.len() as _);
    if let Some(link) = link {
        header.set_link_name(link).unwrap();
    }
    header.set_cksum();

    builder.append(&header, data).unwrap();
}

/// A fixture resembling a small real world package.
pub fn sample_fixture(compression: Compression) -> DebFixture {
    let md5sums = format!(
        "{}  usr/bin/hello\n{}  usr/share/doc/hello/copyright\n",
        crate::checksum::ChecksumType::Md5.hex_digest(HELLO_BINARY),
        crate::checksum::ChecksumType::Md5.hex_digest(HELLO_COPYRIGHT),
    );

    DebFixture::default()
        .compression(compression)
        .control_file(
            "control",
            indoc::indoc! {b"
                Package: hello
                Version: 1.0-1
                Architecture: amd64
                Maintainer: Jane Doe <jane@example.com>
                Installed-Size: 12
                Depends: libc6 (>= 2.31)
                Description: greets the world
                 hello prints a greeting.
                 .
                 It is used as a test fixture.
            "},
        )
        .control_file("md5sums", md5sums.as_bytes())
        .control_file("conffiles", b"/etc/hello.conf\n")
        .control_file("triggers", b"activate-noawait ldconfig\n")
        .control_file("shlibs", b"libhello 1 hello (>= 1.0)\n")
        .control_file(
            "symbols",
            b"libhello.so.1 hello #MINVER#\n hello_greet@Base 1.0\n",
        )
        .control_file("postinst", b"#!/bin/sh\nset -e\nldconfig\n")
        .control_file("prerm", b"#!/bin/sh\nexit 0\n")
        .control_file("templates", b"Template: hello/greeting\n")
        .data_directory("./")
        .data_directory("./etc/")
        .data_file("./etc/hello.conf", HELLO_CONF)
        .data_directory("./usr/")
        .data_directory("./usr/bin/")
        .data_file_mode("./usr/bin/hello", HELLO_BINARY, 0o755)
        .data_symlink("./usr/bin/hi", "hello")
        .data_hardlink("./usr/bin/hello-again", "./usr/bin/hello")
        .data_directory("./usr/share/")
        .data_directory("./usr/share/doc/")
        .data_directory("./usr/share/doc/hello/")
        .data_file("./usr/share/doc/hello/copyright", HELLO_COPYRIGHT)
}

/// Bytes of [sample_fixture()].
pub fn sample_deb(compression: Compression) -> Vec<u8> {
    sample_fixture(compression).build()
}
