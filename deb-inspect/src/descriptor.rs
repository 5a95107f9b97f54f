// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Auxiliary descriptor files in `control.tar`.

These are the `conffiles`, `triggers`, `shlibs`, and `symbols` files. Each is
a simple line oriented format documented in `deb-conffiles(5)`,
`deb-triggers(5)`, `deb-shlibs(5)`, and `deb-symbols(5)` respectively.

Parsing is lenient: lines that don't fit the grammar are ignored.
*/

/// Lines that are neither blank nor comments, with trailing whitespace removed.
fn meaningful_lines(data: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(data)
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .collect()
}

/// An entry in a `conffiles` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conffile {
    /// Absolute path of the configuration file.
    pub path: String,

    /// Flags preceding the path, such as `remove-on-upgrade`.
    pub flags: Vec<String>,
}

/// A parsed `conffiles` file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConffilesFile {
    entries: Vec<Conffile>,
}

impl ConffilesFile {
    /// Parse `conffiles` content.
    pub fn parse(data: &[u8]) -> Self {
        let entries = meaningful_lines(data)
            .into_iter()
            .filter_map(|line| {
                let mut words = line.split_ascii_whitespace().collect::<Vec<_>>();
                let path = words.pop()?.to_string();

                Some(Conffile {
                    path,
                    flags: words.into_iter().map(|x| x.to_string()).collect(),
                })
            })
            .collect();

        Self { entries }
    }

    /// Whether no configuration files are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of declared configuration files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over declared configuration files.
    pub fn iter(&self) -> impl Iterator<Item = &Conffile> {
        self.entries.iter()
    }

    /// Whether a path is declared as a configuration file.
    ///
    /// Leading `.` characters are ignored so that `data.tar` paths can be passed directly.
    pub fn contains(&self, path: &str) -> bool {
        let path = path.trim_start_matches('.');

        self.entries.iter().any(|e| e.path == path)
    }
}

/// The directive of a trigger declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TriggerDirective {
    Interest,
    InterestAwait,
    InterestNoawait,
    Activate,
    ActivateAwait,
    ActivateNoawait,
    Other(String),
}

impl From<&str> for TriggerDirective {
    fn from(s: &str) -> Self {
        match s {
            "interest" => Self::Interest,
            "interest-await" => Self::InterestAwait,
            "interest-noawait" => Self::InterestNoawait,
            "activate" => Self::Activate,
            "activate-await" => Self::ActivateAwait,
            "activate-noawait" => Self::ActivateNoawait,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl TriggerDirective {
    /// Whether this directive declares interest in a trigger.
    pub fn is_interest(&self) -> bool {
        matches!(
            self,
            Self::Interest | Self::InterestAwait | Self::InterestNoawait
        )
    }

    /// Whether this directive activates a trigger.
    pub fn is_activation(&self) -> bool {
        matches!(
            self,
            Self::Activate | Self::ActivateAwait | Self::ActivateNoawait
        )
    }
}

/// A trigger declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trigger {
    pub directive: TriggerDirective,
    pub name: String,
}

/// A parsed `triggers` file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TriggersFile {
    triggers: Vec<Trigger>,
}

impl TriggersFile {
    /// Parse `triggers` content.
    pub fn parse(data: &[u8]) -> Self {
        let triggers = meaningful_lines(data)
            .into_iter()
            .filter_map(|line| {
                let mut words = line.split_ascii_whitespace();

                match (words.next(), words.next()) {
                    (Some(directive), Some(name)) => Some(Trigger {
                        directive: directive.into(),
                        name: name.to_string(),
                    }),
                    _ => None,
                }
            })
            .collect();

        Self { triggers }
    }

    /// Whether no triggers are declared.
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Iterate over all trigger declarations.
    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    /// Names of triggers this package is interested in.
    pub fn interests(&self) -> impl Iterator<Item = &str> {
        self.triggers
            .iter()
            .filter(|t| t.directive.is_interest())
            .map(|t| t.name.as_str())
    }

    /// Names of triggers this package activates.
    pub fn activations(&self) -> impl Iterator<Item = &str> {
        self.triggers
            .iter()
            .filter(|t| t.directive.is_activation())
            .map(|t| t.name.as_str())
    }
}

/// An entry in a `shlibs` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharedLib {
    /// Package type this entry applies to (e.g. `udeb`). [None] for regular packages.
    pub package_type: Option<String>,

    /// Library name. e.g. `libz`.
    pub library: String,

    /// The soname version. e.g. `1`.
    pub version: String,

    /// The dependency expression for packages linking this library.
    pub dependencies: String,
}

/// A parsed `shlibs` file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SharedLibsFile {
    entries: Vec<SharedLib>,
}

impl SharedLibsFile {
    /// Parse `shlibs` content.
    pub fn parse(data: &[u8]) -> Self {
        let entries = meaningful_lines(data)
            .into_iter()
            .filter_map(|line| {
                let (package_type, rest) = match line.split_once(' ') {
                    Some((first, rest)) if first.ends_with(':') => (
                        Some(first.trim_end_matches(':').to_string()),
                        rest.trim_start(),
                    ),
                    _ => (None, line.as_str()),
                };

                let mut parts = rest.splitn(3, char::is_whitespace);
                let library = parts.next()?.to_string();
                let version = parts.next()?.to_string();
                let dependencies = parts.next().unwrap_or_default().trim().to_string();

                Some(SharedLib {
                    package_type,
                    library,
                    version,
                    dependencies,
                })
            })
            .collect();

        Self { entries }
    }

    /// Whether the file has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = &SharedLib> {
        self.entries.iter()
    }

    /// Find the entry for a library and soname version that applies to regular packages.
    pub fn find(&self, library: &str, version: &str) -> Option<&SharedLib> {
        self.entries.iter().find(|e| {
            e.package_type.is_none() && e.library == library && e.version == version
        })
    }
}

/// A symbol exported by a shared library.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Symbol {
    /// Symbol name including its version, e.g. `inflate@ZLIB_1.2.0`.
    pub name: String,

    /// Minimal package version providing this symbol.
    pub minimal_version: String,

    /// Index of an alternative dependency template, if any.
    pub dependency_template: Option<usize>,
}

/// The symbols of a single shared library in a `symbols` file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LibrarySymbols {
    /// The library soname. e.g. `libz.so.1`.
    pub soname: String,

    /// Main dependency template. e.g. `zlib1g #MINVER#`.
    pub dependency: String,

    /// Alternative dependency templates (`| ...` lines).
    pub alternative_dependencies: Vec<String>,

    /// Meta-information fields (`* Field: value` lines).
    pub fields: Vec<(String, String)>,

    /// Exported symbols.
    pub symbols: Vec<Symbol>,
}

/// A parsed `symbols` file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolsFile {
    libraries: Vec<LibrarySymbols>,
}

impl SymbolsFile {
    /// Parse `symbols` content.
    pub fn parse(data: &[u8]) -> Self {
        let mut libraries: Vec<LibrarySymbols> = vec![];

        for line in meaningful_lines(data) {
            if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
                let mut words = rest.split_ascii_whitespace();

                if let (Some(library), Some(name), Some(minimal_version)) =
                    (libraries.last_mut(), words.next(), words.next())
                {
                    library.symbols.push(Symbol {
                        name: name.to_string(),
                        minimal_version: minimal_version.to_string(),
                        dependency_template: words.next().and_then(|x| x.parse().ok()),
                    });
                }
            } else if let Some(rest) = line.strip_prefix('|') {
                if let Some(library) = libraries.last_mut() {
                    library
                        .alternative_dependencies
                        .push(rest.trim().to_string());
                }
            } else if let Some(rest) = line.strip_prefix('*') {
                if let (Some(library), Some((name, value))) =
                    (libraries.last_mut(), rest.split_once(':'))
                {
                    library
                        .fields
                        .push((name.trim().to_string(), value.trim().to_string()));
                }
            } else if let Some((soname, dependency)) = line.split_once(char::is_whitespace) {
                libraries.push(LibrarySymbols {
                    soname: soname.to_string(),
                    dependency: dependency.trim().to_string(),
                    ..Default::default()
                });
            }
        }

        Self { libraries }
    }

    /// Whether the file describes no libraries.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Iterate over described libraries.
    pub fn iter(&self) -> impl Iterator<Item = &LibrarySymbols> {
        self.libraries.iter()
    }

    /// Obtain the symbols of a library by soname.
    pub fn library(&self, soname: &str) -> Option<&LibrarySymbols> {
        self.libraries.iter().find(|l| l.soname == soname)
    }

    /// Obtain the minimal version providing a symbol in a library.
    pub fn minimal_version(&self, soname: &str, symbol: &str) -> Option<&str> {
        self.library(soname)?
            .symbols
            .iter()
            .find(|s| s.name == symbol)
            .map(|s| s.minimal_version.as_str())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    #[test]
    fn blank_and_comment_lines_skipped() {
        assert_eq!(
            meaningful_lines(b"# header\n\nfoo  \n   \n  # indented\n\tbar\n"),
            vec!["foo".to_string(), "\tbar".to_string()]
        );
        assert!(meaningful_lines(b"").is_empty());
    }

    #[test]
    fn conffiles() {
        let conffiles = ConffilesFile::parse(
            indoc! {"
                /etc/foo.conf

                remove-on-upgrade /etc/foo.d/old.conf
            "}
            .as_bytes(),
        );

        assert_eq!(conffiles.len(), 2);
        assert!(conffiles.contains("/etc/foo.conf"));
        assert!(conffiles.contains("./etc/foo.conf"));
        assert!(!conffiles.contains("/etc/bar.conf"));
        assert_eq!(
            conffiles.iter().nth(1),
            Some(&Conffile {
                path: "/etc/foo.d/old.conf".into(),
                flags: vec!["remove-on-upgrade".into()],
            })
        );
    }

    #[test]
    fn triggers() {
        let triggers = TriggersFile::parse(
            indoc! {"
                # Triggers added by dh_makeshlibs
                activate-noawait ldconfig
                interest /usr/share/icons/hicolor
                interest-noawait update-fonts
                bogus
            "}
            .as_bytes(),
        );

        assert_eq!(triggers.iter().count(), 3);
        assert_eq!(triggers.activations().collect::<Vec<_>>(), vec!["ldconfig"]);
        assert_eq!(
            triggers.interests().collect::<Vec<_>>(),
            vec!["/usr/share/icons/hicolor", "update-fonts"]
        );
    }

    #[test]
    fn shlibs() {
        let shlibs = SharedLibsFile::parse(
            indoc! {"
                libz 1 zlib1g (>= 1:1.2.11)
                udeb: libz 1 zlib1g-udeb (>= 1:1.2.11)
                libbare 2
            "}
            .as_bytes(),
        );

        assert_eq!(shlibs.iter().count(), 3);
        let entry = shlibs.find("libz", "1").unwrap();
        assert_eq!(entry.dependencies, "zlib1g (>= 1:1.2.11)");
        assert_eq!(entry.package_type, None);

        let udeb = shlibs.iter().nth(1).unwrap();
        assert_eq!(udeb.package_type.as_deref(), Some("udeb"));
        assert_eq!(udeb.dependencies, "zlib1g-udeb (>= 1:1.2.11)");

        assert_eq!(shlibs.find("libbare", "2").unwrap().dependencies, "");
        assert!(shlibs.find("libz", "2").is_none());
    }

    #[test]
    fn symbols() {
        let symbols = SymbolsFile::parse(
            indoc! {"
                libz.so.1 zlib1g #MINVER#
                | zlib1g-alt
                * Build-Depends-Package: zlib1g-dev
                 ZLIB_1.2.0@ZLIB_1.2.0 1:1.2.0
                 inflate@Base 1:1.1.4
                 gzopen64@ZLIB_1.2.3.3 1:1.2.3.3 1
                libother.so.2 libother2
                 other@Base 2.0
            "}
            .as_bytes(),
        );

        assert_eq!(symbols.iter().count(), 2);

        let libz = symbols.library("libz.so.1").unwrap();
        assert_eq!(libz.dependency, "zlib1g #MINVER#");
        assert_eq!(libz.alternative_dependencies, vec!["zlib1g-alt".to_string()]);
        assert_eq!(
            libz.fields,
            vec![(
                "Build-Depends-Package".to_string(),
                "zlib1g-dev".to_string()
            )]
        );
        assert_eq!(libz.symbols.len(), 3);
        assert_eq!(libz.symbols[2].dependency_template, Some(1));

        assert_eq!(
            symbols.minimal_version("libz.so.1", "inflate@Base"),
            Some("1:1.1.4")
        );
        assert_eq!(
            symbols.minimal_version("libother.so.2", "other@Base"),
            Some("2.0")
        );
        assert_eq!(symbols.minimal_version("libother.so.2", "inflate@Base"), None);
    }
}
