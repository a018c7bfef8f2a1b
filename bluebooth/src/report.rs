use std::path::Path;

use bluebooth_core::{LinkKey, MacAddress};
use colored::Colorize;
use serde::Serialize;

/// Machine-readable summary of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub target_mac: MacAddress,
    pub host_mac: Option<MacAddress>,
    pub link_key: Option<LinkKey>,
    pub config_path: Option<String>,
    pub patched: bool,
}

pub fn render_parsing(reg_file: &Path) -> String {
    format!("Parsing {} file...", reg_file.display())
}

pub fn render_host_found(host: &MacAddress) -> String {
    format!("Found host bluetooth mac address [{host}]")
        .cyan()
        .to_string()
}

pub fn render_key_found(key: &LinkKey) -> String {
    format!("Pairing key found [{key}]").cyan().to_string()
}

pub fn render_config_path(path: &Path) -> String {
    format!(
        "\nPath of target bluetooth info file is:\n{}",
        path.display().to_string().bold()
    )
}

pub fn render_patching(target: &Path, backup: &Path) -> String {
    format!(
        "Writing new config file {} (backup at {})...",
        target.display(),
        backup.display()
    )
}

/// Notice printed once the key is in place.
///
/// `extracted_from` is the standard BlueZ path when the user patched a copy
/// of the file somewhere else and still needs to put it back.
pub fn render_finished(previous_key: Option<&str>, extracted_from: Option<&Path>) -> String {
    let mut out = vec![String::new(), "Successfully replaced pairing key.".green().to_string()];
    if let Some(previous) = previous_key {
        out.push(format!("Previous key was [{previous}]"));
    }
    if let Some(path) = extracted_from {
        out.push(String::new());
        out.push("If you extracted the bluetooth config file from".to_string());
        out.push(path.display().to_string());
        out.push("You must replace the original file.".yellow().to_string());
    }
    out.push(String::new());
    out.push("Bluetooth service needs to be restarted in order to use the new pairing key.".to_string());
    out.push(
        "You may run 'sudo systemctl restart bluetooth.service' or reboot host machine."
            .to_string(),
    );
    out.join("\n")
}

pub fn render_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_colon_form_and_plain_key() {
        let report = RunReport {
            target_mac: "aabbccddeeff".parse().expect("target"),
            host_mac: Some("001122334455".parse().expect("host")),
            link_key: LinkKey::from_hex_value("0a,0b"),
            config_path: None,
            patched: false,
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&report).expect("json")).expect("parse");
        assert_eq!(value["target_mac"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(value["host_mac"], "00:11:22:33:44:55");
        assert_eq!(value["link_key"], "0A0B");
        assert!(value["config_path"].is_null());
        assert_eq!(value["patched"], false);
    }

    #[test]
    fn finished_mentions_copy_back_only_for_extracted_files() {
        colored::control::set_override(false);
        let plain = render_finished(None, None);
        assert!(!plain.contains("You must replace the original file."));
        assert!(plain.contains("Successfully replaced pairing key."));

        let extracted = render_finished(
            Some("00"),
            Some(Path::new("/var/lib/bluetooth/A/B/info")),
        );
        assert!(extracted.contains("/var/lib/bluetooth/A/B/info"));
        assert!(extracted.contains("Previous key was [00]"));
    }
}
