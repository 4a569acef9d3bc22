use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = r###"
Duckgate is a thin HTTP facade over the Duck.ai conversational backend. It mints
session tokens, forwards chat completions, and relays streamed responses back to
the caller without buffering.

It also ships an optional reverse-proxy front door and a client IP allowlist for
deployments that want a coarse access gate in front of the facade.
"###
)]
pub struct Args {
    #[command(subcommand)]
    pub subcmd: Option<SubCommands>,
}

#[derive(Parser, Debug)]
pub enum SubCommands {
    /// Start the facade server (the default when no subcommand is given)
    Start(StartSubCommand),
    /// Start the reverse proxy in front of a fixed backend origin
    Proxy(ProxySubCommand),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Start the Duckgate facade", long_about = None)]
pub struct StartSubCommand {}

#[derive(Parser, Debug)]
#[command(author, version, about = "Start the reverse proxy", long_about = None)]
pub struct ProxySubCommand {}
