use std::path::Path;

use clap::Subcommand;

use provctl::config;
use provctl::output;

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config
    Show,
}

pub fn execute(command: ConfigCommands, path: &Path) -> eyre::Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(eyre::eyre!(
                    "config already exists at {} (use --force to overwrite)",
                    path.display()
                ));
            }
            let config = config::default_config()?;
            config::save_config(&config, path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }

        ConfigCommands::Show => {
            let config = config::load_or_default(path)?;
            println!("# {}", path.display());
            output::print_json(&config)
        }
    }
}
