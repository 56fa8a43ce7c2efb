use crate::config::Settings;
use clap::Parser;
use std::path::PathBuf;

/// Watch a file and sync its contents to Consul KV
#[derive(Parser, Debug)]
#[command(name = "consul-file-sync", version, about)]
pub struct Cli {
    /// Absolute path of the file to watch (must exist)
    #[arg(long)]
    pub file: Option<String>,

    /// Consul HTTP address [default: http://localhost:8500]
    #[arg(long, env = "CONSUL_HTTP_ADDR")]
    pub consul_url: Option<String>,

    /// Consul KV key where file content will be stored
    #[arg(long)]
    pub kv_key: Option<String>,

    /// Consul ACL token (SecretID)
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Polling interval in seconds [default: 2]
    #[arg(long)]
    pub interval: Option<u64>,

    /// HTTP request timeout in seconds [default: 5]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// TOML file providing any of the options above
    #[arg(long, env = "CONSUL_FILE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// The command line as a settings layer. Unset flags stay `None` so the
    /// config file can fill them in.
    pub fn settings(&self) -> Settings {
        Settings {
            file: self.file.clone(),
            consul_url: self.consul_url.clone(),
            kv_key: self.kv_key.clone(),
            token: self.token.clone(),
            interval: self.interval,
            timeout: self.timeout,
            log_file: self.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "consul-file-sync",
            "--file",
            "/etc/ssh/ca.pub",
            "--consul-url",
            "http://consul:8500",
            "--kv-key",
            "ca/pub-key/id_rsa.pub",
            "--token",
            "secret",
            "--interval",
            "10",
            "--timeout",
            "3",
        ])
        .unwrap();

        let settings = cli.settings();
        assert_eq!(settings.file.as_deref(), Some("/etc/ssh/ca.pub"));
        assert_eq!(settings.consul_url.as_deref(), Some("http://consul:8500"));
        assert_eq!(settings.kv_key.as_deref(), Some("ca/pub-key/id_rsa.pub"));
        assert_eq!(settings.token.as_deref(), Some("secret"));
        assert_eq!(settings.interval, Some(10));
        assert_eq!(settings.timeout, Some(3));
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn test_rejects_non_numeric_interval() {
        let result = Cli::try_parse_from(["consul-file-sync", "--interval", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
