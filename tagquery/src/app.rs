//! Core application

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, DEFAULT_LOG_FILTER, ENV_LOG};
use crate::filter::{Filter, FilterCompiler, parse_filter, sort_safe};
use crate::sql::{Dialect, order_by_from_strs};
use crate::utils::file::read_input;
use crate::utils::string::parse_field_list;

pub struct CoreApp {
    pub config: AppConfig,
    pub compiler: FilterCompiler,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!(app = APP_NAME, "Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config)?;
        let input = read_input(command_input(&command))?;
        let output = app.execute(&command, &input)?;

        let rendered = serde_json::to_string_pretty(&output).context("Failed to encode output")?;
        println!("{}", rendered);
        Ok(())
    }

    pub fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let compiler = FilterCompiler::new(config.compiler);
        Self { config, compiler }
    }

    /// Execute a command against already-read input text
    pub fn execute(&self, command: &Commands, input: &str) -> Result<Value> {
        let filter = parse_filter(input).context("Invalid input")?;

        match command {
            Commands::Sql {
                dialect,
                offset,
                order_by,
                ..
            } => self.compile_sql(&filter, self.dialect(*dialect), *offset, order_by.as_deref()),
            Commands::Document { .. } => {
                let doc = self.compiler.to_document(&filter)?;
                Ok(Value::Object(doc))
            }
            Commands::Sanitize {
                allow,
                deny,
                defaults,
                ..
            } => self.sanitize(filter, allow.as_deref(), deny.as_deref(), defaults.as_deref()),
            Commands::Update { dialect, .. } => {
                let dialect = self.dialect(*dialect);
                let clause = self.compiler.update_to_sql(&filter, dialect.dialect())?;
                let document = self.compiler.update_to_document(&filter)?;
                Ok(json!({
                    "sql": clause.sql,
                    "values": clause.values,
                    "document": document,
                }))
            }
        }
    }

    fn dialect(&self, requested: Option<Dialect>) -> Dialect {
        requested.unwrap_or(self.config.sql.dialect)
    }

    fn compile_sql(
        &self,
        filter: &Filter,
        dialect: Dialect,
        offset: usize,
        order_by: Option<&str>,
    ) -> Result<Value> {
        let clause = self
            .compiler
            .to_sql_with_offset(filter, dialect.dialect(), offset)?;

        let requested = order_by.map(parse_field_list).unwrap_or_default();
        let sql_config = &self.config.sql;
        let sort_keys = sort_safe(
            sql_config.sortable.as_deref(),
            &sql_config.default_sort,
            &requested,
        );
        let order_by =
            order_by_from_strs(&sort_keys, dialect.dialect(), self.compiler.config().fold_case)?;

        let mut output = json!({
            "dialect": dialect,
            "sql": clause.sql,
            "values": clause.values,
        });
        if !order_by.is_empty()
            && let Value::Object(map) = &mut output
        {
            map.insert("order_by".to_string(), Value::String(order_by));
        }
        Ok(output)
    }

    fn sanitize(
        &self,
        mut filter: Filter,
        allow: Option<&str>,
        deny: Option<&str>,
        defaults: Option<&str>,
    ) -> Result<Value> {
        let mut sanitizer = self.config.sanitize.apply_to(self.compiler.sanitizer());
        if let Some(allow) = allow {
            sanitizer = sanitizer.allow(parse_field_list(allow));
        }
        if let Some(deny) = deny {
            sanitizer = sanitizer.deny(parse_field_list(deny));
        }
        if let Some(defaults) = defaults {
            let defaults = parse_filter(defaults).context("Invalid --defaults")?;
            sanitizer = sanitizer.defaults(defaults);
        }

        sanitizer.apply(&mut filter)?;
        Ok(Value::Object(filter))
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        // stdout carries command output, so logs go to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(false)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

fn command_input(command: &Commands) -> Option<&std::path::Path> {
    match command {
        Commands::Sql { input, .. }
        | Commands::Document { input }
        | Commands::Sanitize { input, .. }
        | Commands::Update { input, .. } => input.as_deref(),
    }
}
