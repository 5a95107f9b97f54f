// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::{anyhow, Result},
    clap::{Arg, ArgMatches, Command},
    deb_inspect::{
        acquire::open_package,
        checksum::ChecksumType,
        error::DebInspectError,
        options::PackageOptions,
        package::{FileType, PackageFile},
    },
    futures::StreamExt,
    slog::warn,
    std::sync::Arc,
};

const ABOUT: &str = "\
# About

`debinspect` extracts metadata from Debian binary packages (`.deb` files)
and OpenWrt `.ipk` files.

Packages can be given as filesystem paths or as `http://` / `https://` URLs.
";

const SCAN_ABOUT: &str = "\
Reads many packages concurrently and prints a one line summary of each.

Packages that fail to read are reported on stderr and skipped. Network
failures are retried once.
";

pub async fn run() -> Result<()> {
    let default_threads = format!("{}", num_cpus::get());

    let app = Command::new("Debian Package Inspector")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Inspect the content of Debian binary packages")
        .long_about(ABOUT)
        .arg_required_else_help(true);

    let app = app.arg(
        Arg::new("hash")
            .long("hash")
            .takes_value(true)
            .default_value("md5")
            .possible_values(["md5", "sha1", "sha256"])
            .global(true)
            .help("Checksum algorithm for files in data.tar"),
    );

    let app = app.arg(
        Arg::new("meta_only")
            .long("meta-only")
            .global(true)
            .help("Only read metadata; do not read or hash file content"),
    );

    let app = app.arg(
        Arg::new("no_recalculate")
            .long("no-recalculate")
            .global(true)
            .help("Do not compare declared md5sums against file content"),
    );

    let app = app.arg(
        Arg::new("verbose")
            .short('v')
            .multiple_occurrences(true)
            .global(true)
            .help("Increase logging verbosity. Can be given multiple times"),
    );

    let uri_arg = Arg::new("uri")
        .required(true)
        .help("Path or URL of package to read");

    let app = app.subcommand(
        Command::new("info")
            .about("Print package metadata")
            .arg(uri_arg.clone()),
    );

    let app = app.subcommand(
        Command::new("files")
            .about("Print the files installed by a package")
            .arg(uri_arg.clone()),
    );

    let app = app.subcommand(
        Command::new("checksums")
            .about("Print declared and calculated checksums of package files")
            .arg(uri_arg.clone()),
    );

    let app = app.subcommand(
        Command::new("verify")
            .about("Verify declared md5sums against package content")
            .arg(uri_arg),
    );

    let app = app.subcommand(
        Command::new("scan")
            .about("Summarize many packages")
            .long_about(SCAN_ABOUT)
            .arg(
                Arg::new("threads")
                    .short('t')
                    .long("threads")
                    .takes_value(true)
                    .default_value(&default_threads)
                    .help("Number of packages to read concurrently"),
            )
            .arg(
                Arg::new("uri")
                    .required(true)
                    .multiple_values(true)
                    .help("Paths or URLs of packages to read"),
            ),
    );

    let matches = app.get_matches();

    let (command, args) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("invalid sub-command"))?;

    let options = package_options(args)?;

    match command {
        "info" => command_info(args, &options),
        "files" => command_files(args, &options),
        "checksums" => command_checksums(args, &options),
        "verify" => command_verify(args, &options),
        "scan" => command_scan(args, options).await,
        _ => panic!("unhandled sub-command"),
    }
}

fn package_options(args: &ArgMatches) -> Result<PackageOptions> {
    let hash = args.value_of("hash").expect("hash argument has default");

    Ok(PackageOptions {
        meta_only: args.is_present("meta_only"),
        recalculate_checksums: !args.is_present("no_recalculate"),
        logger: crate::logging::logger_from_verbosity(args.occurrences_of("verbose")),
        ..PackageOptions::with_hash_name(hash)?
    })
}

fn open_uri_arg(args: &ArgMatches, options: &PackageOptions) -> Result<PackageFile> {
    let uri = args.value_of("uri").expect("uri argument is required");

    Ok(open_package(uri, options)?)
}

fn file_type_char(file_type: FileType) -> char {
    match file_type {
        FileType::Regular => '-',
        FileType::HardLink => 'h',
        FileType::Symlink => 'l',
        FileType::CharDevice => 'c',
        FileType::BlockDevice => 'b',
        FileType::Directory => 'd',
        FileType::Fifo => 'p',
        FileType::Other(_) => '?',
    }
}

fn command_info(args: &ArgMatches, options: &PackageOptions) -> Result<()> {
    let package = open_uri_arg(args, options)?;

    if let Some(path) = package.path() {
        println!("path: {}", path);
    }
    if let Some(size) = package.size() {
        println!("size: {}", size);
    }
    if let Some(modified) = package.modified() {
        println!("modified: {}", modified.to_rfc3339());
    }
    println!("format: {}", package.deb_version());

    for checksum in ChecksumType::all() {
        match package.package_checksum().digest(checksum) {
            Ok(digest) => println!("{}: {}", checksum, digest),
            Err(DebInspectError::PackageChecksumUnavailable) => {}
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    let mut control = vec![];
    package.control().write(&mut control)?;
    print!("{}", String::from_utf8_lossy(&control));

    println!();
    for (name, script) in [
        ("preinst", package.preinst()),
        ("postinst", package.postinst()),
        ("prerm", package.prerm()),
        ("postrm", package.postrm()),
    ] {
        if !script.is_empty() {
            println!("script: {} ({} bytes)", name, script.len());
        }
    }
    for conffile in package.conffiles().iter() {
        println!("conffile: {}", conffile.path);
    }
    for trigger in package.triggers().iter() {
        println!("trigger: {:?} {}", trigger.directive, trigger.name);
    }
    for lib in package.shlibs().iter() {
        println!("shlib: {} {} {}", lib.library, lib.version, lib.dependencies);
    }
    for lib in package.symbols().iter() {
        println!("symbols: {} ({} symbols)", lib.soname, lib.symbols.len());
    }

    Ok(())
}

fn command_files(args: &ArgMatches, options: &PackageOptions) -> Result<()> {
    let package = open_uri_arg(args, options)?;

    for file in package.files() {
        let link = match &file.link_target {
            Some(target) => format!(" -> {}", target),
            None => "".to_string(),
        };

        println!(
            "{}{:04o} {}/{} {:>10} {}{}",
            file_type_char(file.file_type),
            file.mode & 0o7777,
            file.owner,
            file.group,
            file.size,
            file.path,
            link
        );
    }

    Ok(())
}

fn command_checksums(args: &ArgMatches, options: &PackageOptions) -> Result<()> {
    let package = open_uri_arg(args, options)?;

    for file in package.files().iter().filter(|f| f.is_regular()) {
        println!(
            "{} {} {}",
            package.declared_md5(&file.path).unwrap_or("-"),
            package.calculated_checksum(&file.path).unwrap_or("-"),
            file.path
        );
    }

    Ok(())
}

fn command_verify(args: &ArgMatches, options: &PackageOptions) -> Result<()> {
    if !options.reconciles() {
        return Err(anyhow!(
            "verify requires reading file content; remove --meta-only and --no-recalculate"
        ));
    }

    let package = open_uri_arg(args, options)?;

    for mismatch in package.checksum_mismatches() {
        println!(
            "{}: declared {}, calculated {}",
            mismatch.path,
            mismatch.declared,
            mismatch.calculated.as_deref().unwrap_or("<missing>")
        );
    }

    if package.checksum_mismatches().is_empty() {
        println!("{} files verified", package.checksums().declared_len());
        Ok(())
    } else {
        Err(anyhow!(
            "{} files failed verification",
            package.checksum_mismatches().len()
        ))
    }
}

/// Run a package operation, retrying once on failures that may be transient.
fn retry_once<T>(
    logger: &slog::Logger,
    uri: &str,
    mut op: impl FnMut() -> deb_inspect::error::Result<T>,
) -> deb_inspect::error::Result<T> {
    match op() {
        Err(e) if e.is_retryable() => {
            warn!(logger, "retrying {} after error: {}", uri, e);
            op()
        }
        res => res,
    }
}

fn open_with_retry(
    uri: &str,
    options: &PackageOptions,
) -> deb_inspect::error::Result<PackageFile> {
    retry_once(&options.logger, uri, || open_package(uri, options))
}

/// The outcome of reading a single package during a scan.
pub type ScanOutcome = (String, deb_inspect::error::Result<PackageFile>);

/// Read packages concurrently, at most `threads` at a time.
///
/// A package that fails to read yields an error in its outcome and does not
/// stop the others. Outcomes are in completion order.
pub async fn scan_packages(
    uris: Vec<String>,
    options: Arc<PackageOptions>,
    threads: usize,
) -> Result<Vec<ScanOutcome>> {
    if threads == 0 {
        return Err(anyhow!("thread count must be at least 1"));
    }

    // Tasks are spawned as buffer_unordered pulls from the stream.
    let mut buffered = futures::stream::iter(uris)
        .map(|uri| {
            let options = options.clone();

            tokio::task::spawn_blocking(move || {
                let res = open_with_retry(&uri, &options);
                (uri, res)
            })
        })
        .buffer_unordered(threads);

    let mut outcomes = vec![];

    while let Some(res) = buffered.next().await {
        outcomes.push(res?);
    }

    Ok(outcomes)
}

async fn command_scan(args: &ArgMatches, options: PackageOptions) -> Result<()> {
    let threads = args.value_of_t::<usize>("threads")?;
    let uris = args
        .values_of("uri")
        .expect("uri argument is required")
        .map(|uri| uri.to_string())
        .collect::<Vec<_>>();

    let outcomes = scan_packages(uris, Arc::new(options), threads).await?;
    let mut failed = 0;

    for (uri, res) in &outcomes {
        match res {
            Ok(package) => {
                println!(
                    "{} {} {} {} files",
                    package.control().package().unwrap_or("-"),
                    package.control().version().unwrap_or("-"),
                    uri,
                    package.files().len()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("error processing package {} (ignoring): {:?}", uri, e);
            }
        }
    }

    eprintln!("read {} packages; {} failed", outcomes.len() - failed, failed);

    Ok(())
}
