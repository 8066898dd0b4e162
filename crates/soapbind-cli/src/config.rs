use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use soapbind_client_core::{AuthStyle, BindingConfig, Credentials, TransportOptions};
use soapbind_protocol::{TypeChecking, ns};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry::Registry};

/// Calls one SOAP RPC operation and prints the decoded reply
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Endpoint URL
    #[arg(short, long, help = "Endpoint URL, http or https")]
    pub url: String,

    /// Operation to call
    pub operation: String,

    /// Positional arguments, sent as strings in order
    #[arg(conflicts_with = "params")]
    pub args: Vec<String>,

    /// Named parameters
    #[arg(short = 'p', long = "param", value_parser = parse_pair, help = "Named parameter NAME=VALUE, repeatable")]
    pub params: Vec<(String, String)>,

    #[arg(short, long, help = "Namespace URI of the operation element")]
    pub namespace: Option<String>,

    #[arg(long, help = "SOAPAction header value")]
    pub soap_action: Option<String>,

    #[arg(long, help = "Write WS-Addressing headers")]
    pub ws_addressing: bool,

    #[arg(long, requires = "ws_addressing", help = "WS-Addressing Action of the request")]
    pub ws_action: Option<String>,

    #[arg(short, long, help = "Authentication method", default_value_t = AuthMethod::None)]
    pub auth_method: AuthMethod,

    #[arg(short = 'U', long, help = "Username for authentication")]
    pub username: Option<String>,

    #[arg(short = 'P', long, help = "Password for authentication")]
    pub password: Option<String>,

    #[arg(short = 'H', long = "header", value_parser = parse_header, help = "Extra HTTP header NAME:VALUE, repeatable")]
    pub headers: Vec<(String, String)>,

    /// Coerce numeric text and integral floats instead of rejecting them
    #[arg(long)]
    pub lenient: bool,

    /// DANGEROUS: accept any TLS certificate and host name
    #[arg(long, help = "Skip TLS certificate validation (insecure, for testing only)")]
    pub insecure: bool,

    #[arg(long, default_value = "60", help = "Read timeout in seconds")]
    pub timeout: u64,

    /// Verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase logging verbosity")]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthMethod {
    None,
    Basic,
    Digest,
    /// `BasicAuth` element in the SOAP header
    Header,
}

impl AuthMethod {
    fn style(self) -> AuthStyle {
        match self {
            Self::None => AuthStyle::NONE,
            Self::Basic => AuthStyle::HTTP_BASIC,
            Self::Digest => AuthStyle::HTTP_DIGEST,
            Self::Header => AuthStyle::HEADER_BASIC,
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Basic => write!(f, "basic"),
            Self::Digest => write!(f, "digest"),
            Self::Header => write!(f, "header"),
        }
    }
}

fn split_pair(value: &str, separator: char) -> Result<(String, String), String> {
    let (name, value) = value
        .split_once(separator)
        .ok_or_else(|| format!("expected NAME{separator}VALUE, got {value:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("name must not be empty".to_owned());
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn parse_pair(value: &str) -> Result<(String, String), String> {
    split_pair(value, '=')
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    split_pair(value, ':')
}

/// Logs go to stderr; stdout carries only the reply.
pub fn init_logging(verbose_level: u8) -> anyhow::Result<()> {
    let filter_str = match verbose_level {
        0 => "warn,soapbind_client_core=info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::new(filter_str);

    let subscriber = Registry::default().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .compact(),
    );

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Create binding configuration from command line arguments
pub fn create_binding_config(args: &Args) -> anyhow::Result<BindingConfig> {
    let credentials = match args.auth_method {
        AuthMethod::None => None,
        method => {
            let username = args
                .username
                .clone()
                .with_context(|| format!("--username is required for {method} authentication"))?;
            Some(Credentials::new(username, args.password.clone().unwrap_or_default()))
        }
    };

    if args.insecure {
        tracing::warn!("TLS certificate validation disabled - this is INSECURE!");
    }

    let checking = if args.lenient {
        TypeChecking::Lenient
    } else {
        TypeChecking::Strict
    };

    let transport_options = TransportOptions {
        read_timeout: Some(Duration::from_secs(args.timeout)),
        accept_invalid_certs: args.insecure,
        ..TransportOptions::default()
    };

    let mut config = BindingConfig::builder()
        .url(args.url.clone())
        .auth_style(args.auth_method.style())
        .headers(args.headers.clone())
        .checking(checking)
        .transport_options(transport_options)
        .build();
    config.namespace.clone_from(&args.namespace);
    config.credentials = credentials;
    config.soap_action.clone_from(&args.soap_action);
    config.ws_address_uri = args.ws_addressing.then(|| ns::WSA_2005.to_owned());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("soapbind").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn pairs_need_a_name() {
        assert_eq!(parse_pair("vm=vm-1"), Ok(("vm".to_owned(), "vm-1".to_owned())));
        assert_eq!(parse_pair("expr=a=b"), Ok(("expr".to_owned(), "a=b".to_owned())));
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
        assert_eq!(parse_header("X-Trace: abc"), Ok(("X-Trace".to_owned(), "abc".to_owned())));
    }

    #[test]
    fn digest_config_from_arguments() {
        let args = args(&[
            "--url",
            "https://vc.example.com/sdk",
            "-a",
            "digest",
            "-U",
            "admin",
            "-P",
            "pw",
            "--lenient",
            "-H",
            "X-Trace: 1",
            "RetrieveServiceContent",
        ]);
        let config = create_binding_config(&args).unwrap();

        assert_eq!(config.url.as_deref(), Some("https://vc.example.com/sdk"));
        assert_eq!(config.auth_style, AuthStyle::HTTP_DIGEST);
        assert_eq!(config.credentials, Some(Credentials::new("admin", "pw")));
        assert_eq!(config.checking, TypeChecking::Lenient);
        assert_eq!(config.headers, vec![("X-Trace".to_owned(), "1".to_owned())]);
        assert_eq!(config.ws_address_uri, None);
    }

    #[test]
    fn authentication_requires_a_username() {
        let args = args(&["--url", "http://h/sdk", "-a", "basic", "getStatus"]);
        let err = create_binding_config(&args).unwrap_err();
        assert!(err.to_string().contains("--username is required for basic authentication"));
    }

    #[test]
    fn positional_arguments_and_params_conflict() {
        let result = Args::try_parse_from(["soapbind", "--url", "http://h/sdk", "op", "a", "-p", "x=1"]);
        assert!(result.is_err());
    }
}
