// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Walking of `data.tar` members. */

use {
    crate::{
        checksum::{declared_key, ChecksumType},
        error::{DebInspectError, Result},
        options::PackageOptions,
        package::{FileRecord, FileType},
    },
    std::{
        collections::HashMap,
        io::{Cursor, Read},
    },
};

/// What was learned from a `data.tar`.
#[derive(Clone, Debug, Default)]
pub struct DataTarContents {
    /// Every entry, in archive order.
    pub files: Vec<FileRecord>,

    /// `(tar path, digest)` of each regular file, in archive order.
    ///
    /// Empty when content was not read.
    pub calculated: Vec<(String, String)>,

    /// MD5 of each regular file, keyed by path without its leading `./`.
    ///
    /// Hard links carry the MD5 of their target. Only populated when declared
    /// checksums are reconciled.
    pub content_md5: HashMap<String, String>,
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).to_string()
}

/// Walk a decompressed `data.tar`.
///
/// Every entry produces a [FileRecord]. Unless [PackageOptions::meta_only] is set,
/// regular file content is read and hashed with [PackageOptions::hash].
pub fn walk_data_tar(
    member: &str,
    tar_data: &[u8],
    options: &PackageOptions,
) -> Result<DataTarContents> {
    let map_err = |e| DebInspectError::TarRead(member.to_string(), e);

    let mut archive = tar::Archive::new(Cursor::new(tar_data));
    let mut contents = DataTarContents::default();
    let mut hard_links = vec![];

    for entry in archive.entries().map_err(map_err)? {
        let mut entry = entry.map_err(map_err)?;

        let header = entry.header();
        let record = FileRecord {
            path: lossy(&entry.path_bytes()),
            mode: header.mode().map_err(map_err)?,
            size: entry.size(),
            mtime: header.mtime().map_err(map_err)?,
            owner: header.username_bytes().map(lossy).unwrap_or_default(),
            group: header.groupname_bytes().map(lossy).unwrap_or_default(),
            link_target: entry.link_name_bytes().map(|x| lossy(&x)),
            file_type: FileType::from(header.entry_type()),
        };

        if options.reads_content() && record.is_regular() {
            let mut data = vec![];
            entry.read_to_end(&mut data).map_err(map_err)?;

            let digest = options.hash.hex_digest(&data);

            if options.reconciles() {
                let md5 = if options.hash == ChecksumType::Md5 {
                    digest.clone()
                } else {
                    ChecksumType::Md5.hex_digest(&data)
                };

                contents
                    .content_md5
                    .insert(declared_key(&record.path).to_string(), md5);
            }

            contents.calculated.push((record.path.clone(), digest));
        }

        if options.reconciles() && record.file_type == FileType::HardLink {
            if let Some(target) = &record.link_target {
                hard_links.push((record.path.clone(), target.clone()));
            }
        }

        contents.files.push(record);
    }

    // md5sums lists hard links like any regular file. Archive order guarantees
    // the target was seen first, so chains resolve in a single pass.
    for (path, target) in hard_links {
        if let Some(md5) = contents.content_md5.get(declared_key(&target)).cloned() {
            contents
                .content_md5
                .insert(declared_key(&path).to_string(), md5);
        }
    }

    Ok(contents)
}
