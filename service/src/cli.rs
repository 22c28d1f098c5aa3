// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::path::PathBuf;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.to_possible_value().ok_or(fmt::Error)?;
        f.write_str(value.get_name())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tag configuration file, re-read whenever a tag is placed
    #[arg(short, long, default_value = "tags.yml")]
    pub config: PathBuf,

    /// Minimum level that reaches the log
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["musicfig_service"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("tags.yml"));
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.log_file, None);
    }

    #[test]
    fn explicit_arguments() {
        let cli = Cli::try_parse_from([
            "musicfig_service",
            "--config", "/etc/musicfig/tags.yml",
            "-l", "debug",
            "--log-file", "/var/log/musicfig.log",
        ]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/musicfig/tags.yml"));
        assert_eq!(LevelFilter::from(cli.log_level), LevelFilter::Debug);
        assert_eq!(cli.log_level.to_string(), "debug");
        assert_eq!(cli.log_file, Some(PathBuf::from("/var/log/musicfig.log")));
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(Cli::try_parse_from(["musicfig_service", "--log-level", "loud"]).is_err());
    }
}
