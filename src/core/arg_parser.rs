// src/core/arg_parser.rs

use crate::constants::{
    CONFIG_ID, PROFILE_ID, QUIET_ID, SAVE_CONFIG_ID, SAVE_CONFIG_SHORT, VERBOSE_ID,
};
use crate::system::console::Verbosity;

/// The global options, scanned from argv before the command tree exists.
///
/// This pass knows nothing about command-specific flags: every token it does
/// not recognize is skipped, and nothing is ever "required" here. It only has
/// to find out where the configuration lives and how chatty to be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalFlags {
    /// `-q`/`--quiet`: print only errors.
    pub quiet: bool,
    /// `-v`/`--verbose`: debug output and full error causes.
    pub verbose: bool,
    /// `-sc`/`--save-config`: write the selected commands' values back.
    pub save_config: bool,
    /// `-p`/`--profile`, as typed.
    pub profile: Option<String>,
    /// `-c`/`--config`, as typed (not yet expanded).
    pub config: Option<String>,
}

/// Which valued option a token introduced.
#[derive(Debug, Clone, Copy)]
enum Valued {
    Profile,
    Config,
}

impl GlobalFlags {
    /// Scans the raw arguments (without the program name).
    ///
    /// # Logic:
    /// - `-q`, `-v`, `-sc` and their long forms are switches.
    /// - A short cluster is read left to right like the full parser reads
    ///   it: `q` and `v` are switches, and a `p` or `c` takes the rest of the
    ///   token as its value (`-pwork`, `-qc=/x.cfg`). Any other letter ends
    ///   the cluster, since it belongs to a command-specific option.
    /// - `--profile`/`--config` take `=value` or the next token.
    /// - A value is never taken from a following token that is itself a flag.
    /// - Scanning stops at `--`.
    pub fn scan<S: AsRef<str>>(args: &[S]) -> Self {
        let mut flags = Self::default();
        let mut tokens = args.iter().map(AsRef::as_ref).peekable();

        while let Some(token) = tokens.next() {
            if token == "--" {
                break;
            }
            if token == SAVE_CONFIG_SHORT {
                flags.save_config = true;
                continue;
            }

            let found = if let Some(long) = token.strip_prefix("--") {
                flags.scan_long(long)
            } else if let Some(cluster) = token.strip_prefix('-') {
                flags.scan_cluster(cluster)
            } else {
                None
            };
            let Some((valued, attached)) = found else {
                continue;
            };

            let value = match attached {
                Some(v) => Some(v.to_string()),
                None => match tokens.peek() {
                    Some(next) if !next.starts_with('-') => tokens.next().map(str::to_string),
                    _ => None, // The next token is another flag, or there is none.
                },
            };

            if let Some(value) = value {
                match valued {
                    Valued::Profile => flags.profile = Some(value),
                    Valued::Config => flags.config = Some(value),
                }
            }
        }

        log::debug!("Bootstrap flags: {:?}", flags);
        flags
    }

    /// `-v` wins over `-q`.
    pub fn verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    fn scan_long<'t>(&mut self, long: &'t str) -> Option<(Valued, Option<&'t str>)> {
        let (name, value) = match long.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long, None),
        };
        match name {
            QUIET_ID if value.is_none() => self.quiet = true,
            VERBOSE_ID if value.is_none() => self.verbose = true,
            SAVE_CONFIG_ID if value.is_none() => self.save_config = true,
            PROFILE_ID => return Some((Valued::Profile, value)),
            CONFIG_ID => return Some((Valued::Config, value)),
            _ => {}
        }
        None
    }

    fn scan_cluster<'t>(&mut self, cluster: &'t str) -> Option<(Valued, Option<&'t str>)> {
        for (at, letter) in cluster.char_indices() {
            let valued = match letter {
                'q' => {
                    self.quiet = true;
                    continue;
                }
                'v' => {
                    self.verbose = true;
                    continue;
                }
                'p' => Valued::Profile,
                'c' => Valued::Config,
                _ => return None,
            };
            let tail = cluster.get(at + letter.len_utf8()..).unwrap_or_default();
            let tail = tail.strip_prefix('=').unwrap_or(tail);
            return Some((valued, Some(tail).filter(|t| !t.is_empty())));
        }
        None
    }
}

/// Rewrites the two-letter `-sc` into `--save-config` so the full parser sees a
/// flag it can declare.
pub fn normalize_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let mut normalized = Vec::with_capacity(args.len());
    let mut passthrough = false;
    for arg in args.iter().map(AsRef::as_ref) {
        if !passthrough && arg == SAVE_CONFIG_SHORT {
            normalized.push("--save-config".to_string());
        } else {
            passthrough |= arg == "--";
            normalized.push(arg.to_string());
        }
    }
    normalized
}
