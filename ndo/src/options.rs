use std::{io::IsTerminal as _, time::Duration};

use anyhow::{bail, Result};
use clap::{ColorChoice, Parser};
use ndo_policy::transport::HttpConfig;

use crate::logging;

/// Connection and output options shared by all policy commands.
#[derive(Parser, Debug, Clone)]
pub struct Options {
    /// Address of the Nexus Dashboard Orchestrator
    #[arg(long, global = true, env = "NDO_HOST")]
    pub host: Option<String>,

    /// Port of the orchestrator's REST API, if not the scheme's default
    #[arg(long, global = true, env = "NDO_PORT")]
    pub port: Option<u16>,

    /// Bearer token used to authenticate requests
    #[arg(long, global = true, env = "NDO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Use plain HTTP instead of HTTPS
    #[arg(long, global = true, default_value_t = false)]
    pub no_ssl: bool,

    /// Do not validate the orchestrator's TLS certificate
    #[arg(long, global = true, default_value_t = false)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Compute and report the changes without sending them
    #[arg(long, global = true, default_value_t = false)]
    pub check: bool,

    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

impl Options {
    pub fn http_config(&self) -> Result<HttpConfig> {
        let Some(host) = &self.host else {
            bail!("no orchestrator host given; use --host or NDO_HOST");
        };
        Ok(HttpConfig {
            host: host.clone(),
            port: self.port,
            use_ssl: !self.no_ssl,
            validate_certs: !self.insecure,
            timeout: Duration::from_secs(self.timeout),
            token: self.token.clone(),
        })
    }

    pub fn logging(&self) -> logging::Options {
        logging::Options {
            verbose: self.verbose,
            color: match self.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => std::io::stderr().is_terminal(),
            },
        }
    }
}
