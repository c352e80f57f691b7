// Command line and environment settings

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_AUTOSAVE_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Base url of the form backend
    pub api_url: String,
    pub api_token: Option<String>,
    /// Serve forms from this file instead of the backend
    pub form_file: Option<PathBuf>,
    pub bind: SocketAddr,
    /// Quiet period before a draft is saved
    pub autosave_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            form_file: None,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_MS),
        }
    }
}

impl Settings {
    pub fn command() -> clap::Command {
        clap::Command::new("Formpilot")
            .about("Serves multi-page forms as server-rendered wizards")
            .arg(
                Arg::new("api_url")
                    .long("api-url")
                    .value_name("URL")
                    .env("FORMPILOT_API_URL")
                    .default_value(DEFAULT_API_URL)
                    .help("Base URL of the form backend API"),
            )
            .arg(
                Arg::new("api_token")
                    .long("api-token")
                    .value_name("TOKEN")
                    .env("FORMPILOT_API_TOKEN")
                    .hide_env_values(true)
                    .help("Bearer token sent to the form backend"),
            )
            .arg(
                Arg::new("form_file")
                    .short('f')
                    .long("form-file")
                    .value_name("FILE")
                    .env("FORMPILOT_FORM_FILE")
                    .help("Path to a YAML or JSON file of forms, used instead of the backend"),
            )
            .arg(
                Arg::new("bind")
                    .short('b')
                    .long("bind")
                    .value_name("ADDR")
                    .env("FORMPILOT_BIND")
                    .default_value(DEFAULT_BIND)
                    .help("Address to listen on"),
            )
            .arg(
                Arg::new("autosave_ms")
                    .long("autosave-ms")
                    .value_name("MILLIS")
                    .env("FORMPILOT_AUTOSAVE_MS")
                    .default_value("3000")
                    .value_parser(clap::value_parser!(u64))
                    .help("Delay before a changed draft is saved"),
            )
    }

    /// Parse the process arguments
    pub fn parse() -> Result<Self> {
        Self::from_matches(&Self::command().get_matches())
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let api_url = matches
            .get_one::<String>("api_url")
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let bind = matches
            .get_one::<String>("bind")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_BIND);
        let bind = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address '{}'", bind))?;

        let autosave_ms = matches
            .get_one::<u64>("autosave_ms")
            .copied()
            .unwrap_or(DEFAULT_AUTOSAVE_MS);

        Ok(Self {
            api_url,
            api_token: matches
                .get_one::<String>("api_token")
                .filter(|t| !t.is_empty())
                .cloned(),
            form_file: matches.get_one::<String>("form_file").map(PathBuf::from),
            bind,
            autosave_delay: Duration::from_millis(autosave_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Settings> {
        let matches = Settings::command().try_get_matches_from(args)?;
        Settings::from_matches(&matches)
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&["formpilot"]).unwrap();
        assert_eq!(settings.bind, Settings::default().bind);
        assert_eq!(settings.autosave_delay, Duration::from_millis(3000));
        assert!(settings.form_file.is_none());
    }

    #[test]
    fn test_flags() {
        let settings = parse(&[
            "formpilot",
            "--api-url",
            "https://forms.example.com/api",
            "--form-file",
            "forms.yml",
            "--bind",
            "0.0.0.0:8000",
            "--autosave-ms",
            "500",
        ])
        .unwrap();
        assert_eq!(settings.api_url, "https://forms.example.com/api");
        assert_eq!(settings.form_file, Some(PathBuf::from("forms.yml")));
        assert_eq!(settings.bind.port(), 8000);
        assert_eq!(settings.autosave_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse(&["formpilot", "--bind", "nowhere"]).is_err());
        assert!(parse(&["formpilot", "--autosave-ms", "soon"]).is_err());
    }
}
