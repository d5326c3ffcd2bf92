//! Per-invocation context
//!
//! Resolves the layered configuration once (file, then environment, then
//! flags) and hands commands what they need.

use std::path::{Path, PathBuf};

use fincfg_core::{KindTable, RunConfig};
use fincfg_docs::Corpus;
use fincfg_transport::{ApiClient, Credentials};

use crate::cli::Cli;
use crate::error::{CliError, Result};

pub struct RunContext {
    pub config: RunConfig,
    pub declared_dir: PathBuf,
    pub dry_run: bool,
    pub json: bool,
    pub kinds: KindTable,
}

impl RunContext {
    /// # Errors
    ///
    /// Returns an error if an explicit config file is missing or any
    /// layer fails to parse.
    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self> {
        let mut config = RunConfig::discover(cli.config.as_deref(), cwd)?;
        config.apply_env()?;
        if let Some(url) = &cli.remote_url {
            config.remote.url = Some(url.clone());
        }
        if let Some(tenant) = &cli.tenant {
            config.remote.tenant = tenant.clone();
        }

        Ok(Self {
            config,
            declared_dir: cwd.join(&cli.declared_dir),
            dry_run: cli.dry_run,
            json: cli.json,
            kinds: KindTable::builtin(),
        })
    }

    /// Read the declared corpus
    pub fn corpus(&self) -> Result<Corpus> {
        if !self.declared_dir.is_dir() {
            return Err(CliError::user(format!(
                "Declared directory not found: {} (set --declared-dir)",
                self.declared_dir.display()
            )));
        }
        let corpus = Corpus::load(&self.declared_dir)?;
        tracing::debug!(
            "Read {} document(s) from {}",
            corpus.len(),
            self.declared_dir.display()
        );
        Ok(corpus)
    }

    /// Build the authenticated API client
    pub fn client(&self) -> Result<ApiClient> {
        let config = self.config.client_config()?;
        tracing::debug!("Remote {} (tenant {})", config.base_url, config.tenant);
        Ok(ApiClient::new(config, Credentials::from_env())?)
    }
}
