//! The `fewshot config` command for configuration management.

use clap::{Args, Subcommand};
use fewshot_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml = config.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        command: ConfigCommand,
    }

    #[test]
    fn test_parses_show_and_path() {
        let show = TestCli::try_parse_from(["config", "show"]).unwrap();
        assert!(matches!(show.command, ConfigCommand::Show));

        let path = TestCli::try_parse_from(["config", "path"]).unwrap();
        assert!(matches!(path.command, ConfigCommand::Path));
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(TestCli::try_parse_from(["config", "init"]).is_err());
    }
}
