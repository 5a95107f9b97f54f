// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Assembly of a [PackageFile] from a .deb archive. */

use {
    crate::{
        control::ControlTextParser,
        deb::{
            control_tar::{read_control_tar, ControlTarFile},
            data_tar::walk_data_tar,
            ArMember, ArMemberKind, BinaryPackageReader,
        },
        descriptor::{ConffilesFile, SharedLibsFile, SymbolsFile, TriggersFile},
        error::Result,
        io::decompress_member,
        options::PackageOptions,
        package::PackageFile,
    },
    slog::{debug, info, warn},
    std::{collections::HashMap, io::Read},
};

/// Reads a .deb archive into a [PackageFile] in a single pass.
pub struct PackageReader<'a, R: Read> {
    archive: BinaryPackageReader<R>,
    options: &'a PackageOptions,
}

impl<'a, R: Read> PackageReader<'a, R> {
    pub fn new(reader: R, options: &'a PackageOptions) -> Self {
        Self {
            archive: BinaryPackageReader::new(reader),
            options,
        }
    }

    fn read_control(&self, member: &ArMember, package: &mut PackageFile) -> Result<()> {
        let logger = &self.options.logger;
        let tar_data = decompress_member(&member.name, &member.data)?;

        for entry in read_control_tar(&member.name, &tar_data)? {
            let text = || String::from_utf8_lossy(&entry.data).to_string();

            match &entry.file {
                ControlTarFile::Control => {
                    package.control = ControlTextParser::parse(logger, &entry.data);
                }
                ControlTarFile::Md5sums => {
                    let skipped = package.checksums.parse_md5sums(logger, &entry.data);
                    if skipped > 0 {
                        debug!(logger, "skipped {} malformed md5sums lines", skipped);
                    }
                }
                ControlTarFile::Conffiles => {
                    package.conffiles = ConffilesFile::parse(&entry.data);
                }
                ControlTarFile::Triggers => {
                    package.triggers = TriggersFile::parse(&entry.data);
                }
                ControlTarFile::Shlibs => {
                    package.shlibs = SharedLibsFile::parse(&entry.data);
                }
                ControlTarFile::Symbols => {
                    package.symbols = SymbolsFile::parse(&entry.data);
                }
                ControlTarFile::Preinst => package.scripts.preinst = text(),
                ControlTarFile::Postinst => package.scripts.postinst = text(),
                ControlTarFile::Prerm => package.scripts.prerm = text(),
                ControlTarFile::Postrm => package.scripts.postrm = text(),
                ControlTarFile::Templates | ControlTarFile::Config => {
                    debug!(logger, "ignoring debconf file {}", entry.path);
                }
                ControlTarFile::Other(path) => {
                    debug!(logger, "ignoring unknown control file {}", path);
                }
            }
        }

        Ok(())
    }

    fn read_data(
        &self,
        member: &ArMember,
        package: &mut PackageFile,
        content_md5: &mut HashMap<String, String>,
    ) -> Result<()> {
        let tar_data = decompress_member(&member.name, &member.data)?;
        let contents = walk_data_tar(&member.name, &tar_data, self.options)?;

        for (path, digest) in contents.calculated {
            package.checksums.set_calculated(path, digest);
        }
        content_md5.extend(contents.content_md5);
        package.files.extend(contents.files);

        Ok(())
    }

    /// Consume the archive and produce a [PackageFile].
    ///
    /// The returned instance has an unknown origin and no package checksum source.
    /// Any error aborts the read.
    pub fn read(mut self) -> Result<PackageFile> {
        let logger = self.options.logger.clone();
        let mut package = PackageFile::new(self.options.hash);
        let mut content_md5 = HashMap::new();

        while let Some(member) = self.archive.next_member() {
            let member = member?;

            match member.kind {
                ArMemberKind::DebianBinary => {
                    package.deb_version = member.trimmed_text();
                }
                ArMemberKind::GpgBuilder => {
                    package.gpg_builder = member.trimmed_text();
                }
                ArMemberKind::Control => {
                    self.read_control(&member, &mut package)?;
                }
                ArMemberKind::Data => {
                    self.read_data(&member, &mut package, &mut content_md5)?;
                }
                ArMemberKind::Unrecognized => {
                    debug!(
                        logger,
                        "ignoring unrecognized archive member {}", member.original_name
                    );
                }
            }
        }

        if self.options.reconciles() {
            package.mismatches = package.checksums.reconcile(&content_md5);

            for mismatch in &package.mismatches {
                warn!(
                    logger,
                    "checksum mismatch for {}: declared {}, calculated {}",
                    mismatch.path,
                    mismatch.declared,
                    mismatch.calculated.as_deref().unwrap_or("<missing>")
                );
            }
        }

        info!(
            logger,
            "read package {} {} ({} files)",
            package.control.package().unwrap_or("<unknown>"),
            package.control.version().unwrap_or("<unknown>"),
            package.files.len()
        );

        Ok(package)
    }
}
