use std::path::PathBuf;

use bluebooth_core::MacAddress;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser, Debug)]
#[command(name = "bluebooth")]
#[command(
    about = "Update Linux bluetooth pairing keys from a pre-exported Windows .reg file",
    after_help = "Enjoy!"
)]
pub struct Cli {
    /// Path to pre-exported .reg file.
    #[arg(short, long, value_name = "/path/to/keys.reg")]
    pub reg_file: PathBuf,
    /// MAC address of the target bluetooth device (colon, hyphen or bare hex).
    #[arg(short, long, value_name = "XX:XX:XX:XX:XX:XX")]
    pub mac: MacAddress,
    /// Path to a previously extracted bluetooth config file; avoids sudo usage.
    #[arg(short, long, value_name = "/path/to/info")]
    pub config_file: Option<PathBuf>,
    /// Show the path where the bluetooth info file is located and exit.
    #[arg(short, long)]
    pub show_path: bool,
    /// Extract and report the key without writing any file.
    #[arg(long)]
    pub dry_run: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// BlueZ storage root (overrides the settings file).
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,
    /// Optional settings TOML file.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn malformed_mac_is_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["bluebooth", "-r", "keys.reg", "-m", "aa:bb-cc:dd:ee:ff"])
            .expect_err("mixed separators");
        assert!(err.to_string().contains("--mac"));
    }

    #[test]
    fn short_flags_match_long_ones() {
        let cli = Cli::try_parse_from([
            "bluebooth", "-r", "keys.reg", "-m", "aabbccddeeff", "-c", "info", "-s",
        ])
        .expect("parse");
        assert_eq!(cli.mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(cli.config_file, Some(PathBuf::from("info")));
        assert!(cli.show_path);
        assert_eq!(cli.format, OutputFormat::Text);
    }
}
