// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::Drain;

/// A slog Drain that writes messages to stderr.
pub struct StderrDrain {
    /// Minimum level of records to emit.
    pub min_level: slog::Level,
}

impl slog::Drain for StderrDrain {
    type Ok = ();
    type Err = std::io::Error;

    fn log(
        &self,
        record: &slog::Record,
        _values: &slog::OwnedKVList,
    ) -> Result<Self::Ok, Self::Err> {
        if record.level().is_at_least(self.min_level) {
            eprintln!("{}", record.msg());
        }

        Ok(())
    }
}

/// Resolve the minimum log level from the number of `-v` occurrences.
pub fn level_from_verbosity(verbosity: u64) -> slog::Level {
    match verbosity {
        0 => slog::Level::Warning,
        1 => slog::Level::Info,
        _ => slog::Level::Debug,
    }
}

/// Construct a logger writing to stderr.
pub fn logger_from_verbosity(verbosity: u64) -> slog::Logger {
    slog::Logger::root(
        StderrDrain {
            min_level: level_from_verbosity(verbosity),
        }
        .fuse(),
        slog::o!(),
    )
}
