// src/constants.rs

/// Top-level key holding the name of the profile used when none is selected.
pub const DEFAULT_PROFILE_KEY: &str = "defaultProfile";

/// Top-level key holding the map of named profiles.
pub const PROFILES_KEY: &str = "profiles";

/// Reserved key of a profile node holding the nodes of its sub-commands.
pub const SUBCOMMANDS_KEY: &str = "subcommands";

/// The profile created for a fresh document and used when none is set.
pub const DEFAULT_PROFILE: &str = "default";

/// Extension of the per-command default configuration file (`~/.<name>.cfg`).
pub const CONFIG_FILE_EXTENSION: &str = "cfg";

/// Stand-in shown instead of a secret value.
pub const SECRET_MASK: &str = "********";

/// Marker appended to the help of fields that are persisted with `-sc`.
pub const PERSISTED_MARKER: &str = "©";

/// Prefix of the long flag that turns a boolean field off (`--no-shout`).
pub const NEGATION_PREFIX: &str = "no-";

// Global flags, recognized at every level of the command tree.
/// `-q`/`--quiet`.
pub const QUIET_ID: &str = "quiet";
/// `-v`/`--verbose`.
pub const VERBOSE_ID: &str = "verbose";
/// `--save-config` (also `-sc`).
pub const SAVE_CONFIG_ID: &str = "save-config";
/// `-p`/`--profile`.
pub const PROFILE_ID: &str = "profile";
/// `-c`/`--config`.
pub const CONFIG_ID: &str = "config";

/// The two-letter short form of `--save-config`, which the parser cannot
/// express as a short flag.
pub const SAVE_CONFIG_SHORT: &str = "-sc";

/// Short flags taken by the global options and by help.
pub const RESERVED_SHORTS: &[char] = &['q', 'v', 'p', 'c', 'h'];

/// Long flags taken by the global options and by help.
pub const RESERVED_LONGS: &[&str] = &[
    QUIET_ID,
    VERBOSE_ID,
    SAVE_CONFIG_ID,
    PROFILE_ID,
    CONFIG_ID,
    "help",
];
