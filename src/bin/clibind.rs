// src/bin/clibind.rs

use anyhow::{Result, ensure};
use clibind::core::arg_parser::GlobalFlags;
use clibind::{BindContext, Command, CommandNode, Console, Driver, ExecContext, Field};
use std::env;

const DEFAULT_ENDPOINT: &str = "https://api.example.com";

/// The root: holds the shared `endpoint` and contributes `show` at bind time.
struct Root;

impl Command for Root {
    fn extra_subcommands(&mut self, _ctx: &BindContext<'_>) -> Result<Vec<CommandNode>> {
        Ok(vec![
            CommandNode::with_behavior("show", Show)
                .about("Print the effective value of every field"),
        ])
    }
}

struct Greet;

impl Command for Greet {
    fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<()> {
        let node = ctx.node();
        let name = node.str_value("name").unwrap_or_default().to_string();
        let greeting = node.str_value("greeting").unwrap_or("Hello").to_string();
        let times = node.get_field("times").and_then(Field::as_i64).unwrap_or(1);
        let shout = node.get_field("shout").is_some_and(Field::as_bool);
        ensure!(times >= 0, "times must not be negative (got {})", times);

        let mut line = format!("{}, {}!", greeting, name);
        if shout {
            line = line.to_uppercase();
        }
        for _ in 0..times {
            ctx.console().println(&line)?;
        }
        Ok(())
    }
}

struct Login;

impl Command for Login {
    fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<()> {
        let endpoint = ctx
            .parent()
            .and_then(|parent| parent.str_value("endpoint"))
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string();

        let stored = ctx.node().str_value("user").map(str::to_string);
        let user = match stored {
            Some(user) => user,
            None => ctx.console().prompt().read_line("User", None)?,
        };
        let given = ctx.node().str_value("password").map(str::to_string);
        let password = match given {
            Some(password) => password,
            None => ctx.console().prompt().read_password("Password", None)?,
        };
        log::debug!("Got a password of {} characters", password.chars().count());

        let question = format!("Remember '{}' as the user for {}?", user, endpoint);
        if !ctx.console().prompt().confirm(&question, Some(true))? {
            ctx.console().info("Nothing stored")?;
            return Ok(());
        }
        ctx.node_mut().set_value("user", user.as_str())?;
        ctx.console().info(format!("Logged in to {} as {}", endpoint, user))?;
        Ok(())
    }
}

struct Show;

impl Command for Show {
    fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<()> {
        let tree = ctx.tree();
        let mut lines = Vec::new();
        for id in tree.depth_first() {
            let Some(node) = tree.get(id) else { continue };
            let path = tree.path(id);
            for field in node.fields() {
                let shown = match field.display_value() {
                    Some(_) if field.is_secret() => clibind::constants::SECRET_MASK.to_string(),
                    Some(value) => value,
                    None => "<unset>".to_string(),
                };
                lines.push(format!("{}.{} = {}", path, field.name(), shown));
            }
        }
        for line in lines {
            ctx.console().println(line)?;
        }
        Ok(())
    }
}

fn root() -> CommandNode {
    CommandNode::with_behavior("clibind", Root)
        .about("Commands whose options are remembered per profile")
        .field(
            Field::text("endpoint")
                .short('e')
                .help("Service endpoint")
                .default_value(DEFAULT_ENDPOINT),
        )
        .subcommand(
            CommandNode::with_behavior("greet", Greet)
                .about("Print a greeting")
                .field(Field::text("name").short('n').help("Who to greet").mandatory())
                .field(
                    Field::text("greeting")
                        .short('g')
                        .help("The greeting word")
                        .default_value("Hello"),
                )
                .field(
                    Field::integer("times")
                        .short('t')
                        .help("How many times to greet")
                        .default_value(1),
                )
                .field(Field::flag("shout").short('s').help("Greet in upper case")),
        )
        .subcommand(
            CommandNode::with_behavior("login", Login)
                .about("Log in and remember the user")
                .field(Field::text("user").short('u').help("User name"))
                .field(
                    Field::text("password")
                        .help("Password (asked when omitted, never saved)")
                        .secret()
                        .transient(),
                ),
        )
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let flags = GlobalFlags::scan(&args);
    env_logger::Builder::new()
        .filter_level(flags.verbosity().level_filter())
        .parse_default_env()
        .init();

    let mut driver = Driver::new(root, Console::stdio());
    std::process::exit(driver.run_and_report(&args));
}
