use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fotobonus")]
#[command(author, version, about = "Telegram loyalty-program bot for a photo atelier", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot in normal mode
    Run,

    /// Check the record store configuration and exit
    CheckStore,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
