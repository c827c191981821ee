//! CLI argument definitions using the clap derive API.
//!
//! Argument names, help text and value parsing live here; the command
//! modules receive fully parsed values.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use weft_core::domain::ProxyMode;

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name     = "weft",
    bin_name = "weft",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Inspect pointcuts and advice chains",
    long_about = "Weft checks pointcut expressions against a type catalog and \
                  shows which advices a proxied method call would run, in order.",
    after_help = "EXAMPLES:\n\
        \x20 weft check 'execution(* hello.aop.order..*(..))'\n\
        \x20 weft match 'within(hello.aop..*) && args(String)' --catalog ./catalog\n\
        \x20 weft plan hello.aop.order.OrderServiceImpl.orderItem --aspects ./aspects\n\
        \x20 weft completions bash > ~/.local/share/bash-completion/completions/weft",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a pointcut expression and print its normalised form.
    #[command(
        about = "Check a pointcut expression",
        after_help = "EXAMPLES:\n\
            \x20 weft check 'execution(* *(..)) && !within(hello.aop.internal..*)'\n\
            \x20 weft check '@annotation(retry)' --capture retry=hello.aop.exam.annotation.Retry --tree"
    )]
    Check(CheckArgs),

    /// List catalog methods a pointcut can match.
    #[command(
        name = "match",
        visible_alias = "m",
        about = "List methods matched by a pointcut",
        after_help = "EXAMPLES:\n\
            \x20 weft match 'execution(* hello.aop.order..*(..))'\n\
            \x20 weft match 'args(String, ..)' --catalog ./catalog --output-format json"
    )]
    Match(MatchArgs),

    /// Show the advice chain for one join point.
    #[command(
        about = "Show the advice chain for a method",
        after_help = "EXAMPLES:\n\
            \x20 weft plan hello.aop.order.OrderServiceImpl.orderItem\n\
            \x20 weft plan hello.aop.order.OrderServiceImpl.orderItem --mode subclass\n\
            \x20 weft plan hello.aop.member.MemberServiceImpl.hello --param String --aspects ./aspects"
    )]
    Plan(PlanArgs),

    /// Write a default configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 weft init                     # platform config directory\n\
            \x20 weft -c ./weft.toml init      # explicit location\n\
            \x20 weft init --force --yes       # overwrite without asking"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 weft completions bash > ~/.local/share/bash-completion/completions/weft\n\
            \x20 weft completions zsh  > ~/.zfunc/_weft\n\
            \x20 weft completions fish > ~/.config/fish/completions/weft.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the effective configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 weft config get proxy.mode\n\
            \x20 weft config list\n\
            \x20 weft config path"
    )]
    Config(ConfigCommands),
}

// ── shared source flags ───────────────────────────────────────────────────────

/// Where type and aspect manifests come from, on top of the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    #[arg(
        long = "catalog",
        value_name = "DIR",
        help = "Type catalog manifest directory or file (repeatable)"
    )]
    pub catalog: Vec<PathBuf>,

    #[arg(
        long = "aspects",
        value_name = "DIR",
        help = "Aspect manifest directory or file (repeatable)"
    )]
    pub aspects: Vec<PathBuf>,

    #[arg(long = "no-builtins", help = "Do not preload the builtin types")]
    pub no_builtins: bool,
}

/// `name=Type` pair declaring a pointcut capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub type_name: String,
}

fn parse_capture(raw: &str) -> Result<Capture, String> {
    let (name, type_name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE, got '{raw}'"))?;
    let (name, type_name) = (name.trim(), type_name.trim());
    if name.is_empty() || type_name.is_empty() {
        return Err(format!("expected NAME=TYPE, got '{raw}'"));
    }
    Ok(Capture {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
    })
}

// ── check ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(value_name = "EXPR", help = "Pointcut expression")]
    pub expression: String,

    #[arg(
        long = "capture",
        value_name = "NAME=TYPE",
        value_parser = parse_capture,
        help = "Declare a capture bound by the expression (repeatable)"
    )]
    pub captures: Vec<Capture>,

    #[arg(long = "tree", help = "Also print the expression tree")]
    pub tree: bool,

    #[command(flatten)]
    pub sources: SourceArgs,
}

// ── match ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MatchArgs {
    #[arg(value_name = "EXPR", help = "Pointcut expression")]
    pub expression: String,

    #[arg(
        long = "capture",
        value_name = "NAME=TYPE",
        value_parser = parse_capture,
        help = "Declare a capture bound by the expression (repeatable)"
    )]
    pub captures: Vec<Capture>,

    #[arg(long = "all", help = "Also list methods that cannot match")]
    pub all: bool,

    #[command(flatten)]
    pub sources: SourceArgs,
}

// ── plan ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Fully qualified `Type.method`.
    #[arg(value_name = "TYPE.METHOD", help = "Join point, e.g. a.b.OrderServiceImpl.orderItem")]
    pub join_point: String,

    /// Restrict to the overload with exactly these parameter types.
    #[arg(long = "param", value_name = "TYPE", help = "Parameter type (repeatable, in order)")]
    pub params: Vec<String>,

    #[arg(
        long = "mode",
        value_enum,
        help = "Proxy mode (default from config: proxy.mode)"
    )]
    pub mode: Option<ModeArg>,

    #[arg(
        long = "visible",
        value_name = "TYPE",
        help = "Contract to expose (repeatable; default all)"
    )]
    pub visible: Vec<String>,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    #[value(alias = "jdk")]
    Interface,
    #[value(alias = "cglib")]
    Subclass,
}

impl From<ModeArg> for ProxyMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Interface => ProxyMode::Interface,
            ModeArg::Subclass => ProxyMode::Subclass,
        }
    }
}

// ── init ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,

    #[arg(short = 'y', long = "yes", help = "Do not ask for confirmation")]
    pub yes: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `proxy.mode`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path of the configuration file in use.
    Path,
}
