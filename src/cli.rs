//! Daemon command-line surface.

use std::str::FromStr as _;

use clap::Parser;

use crate::technology::{DEFAULT_TECHNOLOGY_ORDER, Technology};

/// Command-line flags accepted by the daemon binary.
#[derive(Parser, Debug)]
#[command(name = "shill", about = "Connection-manager daemon")]
pub struct Cli {
    /// Run attached to the terminal instead of daemonizing.
    #[arg(long)]
    pub foreground: bool,

    /// Comma-separated link names the daemon never manages.
    #[arg(long = "device-black-list", value_delimiter = ',')]
    pub device_black_list: Vec<String>,

    /// Treat every Ethernet link as managed even without 802.1X.
    #[arg(long)]
    pub ignore_unknown_ethernet: bool,

    /// Comma-separated URLs probed in order for captive-portal detection.
    #[arg(long = "portal-list", value_delimiter = ',')]
    pub portal_list: Vec<String>,

    /// Only observe link state; never bring interfaces up or down.
    #[arg(long)]
    pub passive_mode: bool,

    /// Comma-separated technology priority order, highest first. Falls back
    /// to the compile-time default on any unparseable entry.
    #[arg(long = "default-technology-order", value_parser = parse_technology_order)]
    pub default_technology_order: Option<Vec<Technology>>,

    /// Comma-separated DNS servers prepended ahead of DHCP-supplied ones.
    #[arg(long = "prepend-dns-servers", value_delimiter = ',')]
    pub prepend_dns_servers: Vec<String>,

    /// The smallest MTU the daemon will configure on a managed link.
    /// Failure to parse this flag is fatal.
    #[arg(long = "minimum-mtu")]
    pub minimum_mtu: Option<u32>,

    /// A glob of bus peer names permitted to set the system hostname.
    #[arg(long = "accept-hostname-from")]
    pub accept_hostname_from: Option<String>,

    /// Comma-separated link names DHCPv6 is enabled on.
    #[arg(long = "dhcpv6-enabled-devices", value_delimiter = ',')]
    pub dhcpv6_enabled_devices: Vec<String>,
}

impl Cli {
    /// The technology priority order in effect: the parsed
    /// `--default-technology-order`, or the compile-time default if the
    /// flag was absent or failed to parse.
    #[must_use]
    pub fn technology_order(&self) -> Vec<Technology> {
        self.default_technology_order.clone().unwrap_or_else(|| DEFAULT_TECHNOLOGY_ORDER.to_vec())
    }
}

/// Parses a comma-separated technology order, falling back to the
/// compile-time default rather than a parse error: a single malformed
/// entry should not prevent the daemon from starting.
fn parse_technology_order(raw: &str) -> Result<Vec<Technology>, String> {
    let parsed: Result<Vec<Technology>, _> = raw.split(',').map(Technology::from_str).collect();
    Ok(parsed.unwrap_or_else(|_| DEFAULT_TECHNOLOGY_ORDER.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_lists() {
        let cli = Cli::parse_from([
            "shill",
            "--device-black-list=eth1,eth2",
            "--portal-list=http://a,http://b",
        ]);
        assert_eq!(cli.device_black_list, vec!["eth1", "eth2"]);
        assert_eq!(cli.portal_list, vec!["http://a", "http://b"]);
    }

    #[test]
    fn default_technology_order_is_used_when_flag_absent() {
        let cli = Cli::parse_from(["shill"]);
        assert_eq!(cli.technology_order(), DEFAULT_TECHNOLOGY_ORDER.to_vec());
    }

    #[test]
    fn malformed_technology_order_falls_back_to_default() {
        let cli = Cli::parse_from(["shill", "--default-technology-order=ethernet,nonsense"]);
        assert_eq!(cli.technology_order(), DEFAULT_TECHNOLOGY_ORDER.to_vec());
    }

    #[test]
    fn valid_technology_order_is_honored() {
        let cli = Cli::parse_from(["shill", "--default-technology-order=wifi,ethernet"]);
        assert_eq!(cli.technology_order(), vec![Technology::Wifi, Technology::Ethernet]);
    }

    #[test]
    fn minimum_mtu_must_parse_as_an_integer() {
        let result = Cli::try_parse_from(["shill", "--minimum-mtu=not-a-number"]);
        assert!(result.is_err());
    }
}
