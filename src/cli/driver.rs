// src/cli/driver.rs

//! # Driver
//!
//! Runs one invocation through its phases:
//!
//! `Bootstrap -> ConfigLoaded -> Bound -> Parsed -> Executed -> (Saved) -> Done`
//!
//! Any failure moves the driver to `Error`. Format, read and bind failures
//! happen before anything executes, so a half-bound tree is never run.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;

use crate::cli::dispatcher::{self, Parsed, Selection};
use crate::constants::{CONFIG_ID, PROFILE_ID, SAVE_CONFIG_ID};
use crate::core::arg_parser::GlobalFlags;
use crate::core::binder;
use crate::core::command::{CommandNode, ExecContext};
use crate::core::config_store::ConfigStore;
use crate::core::paths;
use crate::core::tree::CommandTree;
use crate::error::{CliError, CliResult, boxed, render_error};
use crate::models::NodeId;
use crate::system::console::Console;

/// Where an invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Global options scanned, nothing loaded yet.
    Bootstrap,
    /// The configuration file was read and a profile chosen.
    ConfigLoaded,
    /// The tree holds the persisted values.
    Bound,
    /// The command line was accepted.
    Parsed,
    /// The selected command ran.
    Executed,
    /// The configuration was written back.
    Saved,
    /// The invocation finished.
    Done,
    /// The invocation failed.
    Error,
}

/// What a successful invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Help was printed instead of running a command.
    pub help_shown: bool,
    /// Node path of the executed command.
    pub command: Option<String>,
    /// The file the configuration was written to, when `--save-config` was
    /// given and the write succeeded.
    pub saved_to: Option<PathBuf>,
    /// Why the save failed. The invocation still counts as a success.
    pub save_warning: Option<String>,
}

/// A callback run on every freshly built tree, before binding.
pub type Initializer = Box<dyn FnMut(&mut CommandTree)>;

/// Drives invocations of the command tree produced by `factory`.
///
/// A new tree is built for every call to [`Driver::run`]; the last one (and
/// its configuration document) stays available for inspection afterwards.
pub struct Driver<F> {
    factory: F,
    console: Console,
    initializer: Option<Initializer>,
    phase: Phase,
    tree: Option<CommandTree>,
    store: Option<ConfigStore>,
    profile: Option<String>,
}

impl<F> fmt::Debug for Driver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("phase", &self.phase)
            .field("console", &self.console)
            .field("tree", &self.tree)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl<F: Fn() -> CommandNode> Driver<F> {
    /// A driver that builds a fresh tree with `factory` for every run.
    pub fn new(factory: F, console: Console) -> Self {
        Self {
            factory,
            console,
            initializer: None,
            phase: Phase::Bootstrap,
            tree: None,
            store: None,
            profile: None,
        }
    }

    /// Sets values on the tree before the configuration is merged. They take
    /// part in relaxation like persisted values do, and persisted values
    /// override them.
    pub fn with_initializer(mut self, initializer: impl FnMut(&mut CommandTree) + 'static) -> Self {
        self.initializer = Some(Box::new(initializer));
        self
    }

    /// The phase the last run reached.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The tree of the last invocation that got past binding.
    pub fn tree(&self) -> Option<&CommandTree> {
        self.tree.as_ref()
    }

    /// The configuration document of the last invocation, as held in memory.
    pub fn store(&self) -> Option<&ConfigStore> {
        self.store.as_ref()
    }

    /// The profile resolved by the last invocation.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// The console shared by every run.
    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Runs the full protocol. Errors are returned, not printed.
    pub fn run<S: AsRef<str>>(&mut self, args: &[S]) -> CliResult<Outcome> {
        self.tree = None;
        self.store = None;
        self.profile = None;
        self.enter(Phase::Bootstrap);

        match self.run_phases(args) {
            Ok(outcome) => {
                self.enter(Phase::Done);
                Ok(outcome)
            }
            Err(e) => {
                self.enter(Phase::Error);
                Err(e)
            }
        }
    }

    /// Runs the protocol and prints any error on the console.
    ///
    /// Returns the process exit code: `0` on success or help, `1` on error.
    pub fn run_and_report<S: AsRef<str>>(&mut self, args: &[S]) -> i32 {
        match self.run(args) {
            Ok(_) => 0,
            Err(e) => {
                let message = render_error(&e, self.console.is_verbose());
                let label = if self.console.ansi() {
                    "Error:".red().bold().to_string()
                } else {
                    "Error:".to_string()
                };
                if let Err(io) = self.console.println(format!("{} {}", label, message)) {
                    log::error!("{} (could not print it: {})", message, io);
                }
                1
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn run_phases<S: AsRef<str>>(&mut self, args: &[S]) -> CliResult<Outcome> {
        let flags = GlobalFlags::scan(args);
        self.console.set_verbosity(flags.verbosity());
        log::debug!("Global options: {:?}", flags);

        let mut tree = CommandTree::new((self.factory)())?;
        let root_name = tree[tree.root()].name().to_string();
        let path = paths::resolve_config_path(flags.config.as_deref(), &root_name)?;
        let mut store = ConfigStore::open(&path)?;
        let profile = store.resolve_profile(flags.profile.as_deref())?;
        self.enter(Phase::ConfigLoaded);

        if let Some(initializer) = self.initializer.as_mut() {
            initializer(&mut tree);
        }
        binder::bind(&mut tree, store.profile_mut(&profile)?)?;
        self.enter(Phase::Bound);

        let ansi = self.console.ansi();
        let selection = match dispatcher::parse(&mut tree, args, ansi)? {
            Parsed::Help(text) => {
                self.print_raw(&text);
                self.keep(tree, store, profile);
                return Ok(Outcome {
                    help_shown: true,
                    ..Outcome::default()
                });
            }
            Parsed::Matched(selection) => selection,
        };
        ensure_agreement(&flags, &selection)?;
        let chain = selection.chain;
        self.enter(Phase::Parsed);

        let selected = chain.last().copied().unwrap_or_else(|| tree.root());
        self.execute(&mut tree, selected)?;
        self.enter(Phase::Executed);

        let mut outcome = Outcome {
            command: Some(tree.path(selected)),
            ..Outcome::default()
        };
        if flags.save_config {
            match save(&tree, &chain, &mut store, &profile) {
                Ok(()) => {
                    outcome.saved_to = Some(path);
                    self.enter(Phase::Saved);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    let message = render_error(&e, self.console.is_verbose());
                    if let Err(io) = self.console.println(format!("Warning: {}", message)) {
                        log::error!("Could not print warning: {}", io);
                    }
                    outcome.save_warning = Some(e.to_string());
                }
            }
        }

        self.keep(tree, store, profile);
        Ok(outcome)
    }

    fn execute(&mut self, tree: &mut CommandTree, id: NodeId) -> CliResult<()> {
        let usage = dispatcher::render_help(tree, id, self.console.ansi());
        log::debug!("Executing '{}'", tree.path(id));

        let mut behavior = tree[id].take_behavior();
        let result = behavior.execute(&mut ExecContext::new(tree, id, &mut self.console, &usage));
        tree[id].restore_behavior(behavior);

        result.map_err(|e| CliError::Execution {
            command: tree[id].name().to_string(),
            source: boxed(e),
        })
    }

    fn print_raw(&mut self, text: &str) {
        let out = self.console.out();
        if let Err(e) = write!(out, "{}", text).and_then(|()| out.flush()) {
            log::error!("Could not print help: {}", e);
        }
    }

    fn keep(&mut self, tree: CommandTree, store: ConfigStore, profile: String) {
        self.tree = Some(tree);
        self.store = Some(store);
        self.profile = Some(profile);
    }
}

/// Fails when the parser read `-p`, `-c` or `-sc` differently from the scan
/// that chose the configuration file and profile.
fn ensure_agreement(flags: &GlobalFlags, selection: &Selection) -> CliResult<()> {
    let shown = |value: &Option<String>| value.as_deref().unwrap_or("<none>").to_string();
    for (option, early, parsed) in [
        (PROFILE_ID, &flags.profile, &selection.profile),
        (CONFIG_ID, &flags.config, &selection.config),
    ] {
        if early != parsed {
            return Err(CliError::GlobalOptionMismatch {
                option: option.to_string(),
                early: shown(early),
                parsed: shown(parsed),
            });
        }
    }
    if flags.save_config != selection.save_config {
        return Err(CliError::GlobalOptionMismatch {
            option: SAVE_CONFIG_ID.to_string(),
            early: flags.save_config.to_string(),
            parsed: selection.save_config.to_string(),
        });
    }
    Ok(())
}

/// Writes the selected chain back into the profile and persists the document.
fn save(tree: &CommandTree, chain: &[NodeId], store: &mut ConfigStore, profile: &str) -> CliResult<()> {
    binder::save_nodes(tree, chain, store.profile_mut(profile)?)?;
    store.persist()
}
