//! Command dispatch
//!
//! Mutating handlers build and validate their payload first, then resolve
//! configuration, then build the client. A rejected payload therefore never
//! reads the config file or touches the network.

use std::io;

use chrono::Utc;
use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::services::TokenService;
use crate::application::{ApplicationError, IoResultExt};
use crate::cli::args::{flag_pair, AuthCommands, Cli, Commands, ConfigCommands, TokenCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{
    RawOptions, Requirement, StoredConfig, CONFIG_FILE_JSON, CONFIG_FILE_TOML,
};
use crate::domain::{
    ensure_future, format_expiry, parse_expiry, NewToken, TokenField, TokenRecord, TokenUpdate,
};
use crate::infrastructure::di::ServiceContainer;
use crate::util::path::expand_path;

/// Execute a CLI command.
pub async fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    let options = cli.endpoint.to_raw_options();
    match &cli.command {
        Commands::Token { command } => token_command(cli, container, &options, command).await,
        Commands::Auth { command } => match command {
            AuthCommands::Check => _auth_check(cli, container, &options).await,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => _config_show(cli, container, &options),
            ConfigCommands::Path => _config_path(container, &options),
            ConfigCommands::Init { force } => _config_init(cli, container, &options, *force),
        },
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

async fn token_command(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
    command: &TokenCommands,
) -> CliResult<()> {
    match command {
        TokenCommands::Create {
            token_id,
            owner,
            admin,
            secret_phc,
            expires_at,
        } => {
            let token = build_new_token(
                token_id.as_deref(),
                owner,
                *admin,
                secret_phc,
                expires_at.as_deref(),
            )?;
            _token_create(cli, container, options, token).await
        }
        TokenCommands::Update {
            token_id,
            owner,
            admin,
            no_admin,
            secret_phc,
            expires_at,
        } => {
            let update = build_update(
                token_id,
                owner.as_deref(),
                flag_pair(*admin, *no_admin),
                secret_phc.as_deref(),
                expires_at.as_deref(),
            )?;
            _token_update(cli, container, options, update).await
        }
        TokenCommands::Get { token_id, field } => {
            _token_get(cli, container, options, token_id, *field).await
        }
        TokenCommands::List => _token_list(cli, container, options).await,
        TokenCommands::Revoke { token_id } => {
            _token_revoke(cli, container, options, token_id).await
        }
    }
}

/// Build a create payload; a missing token id is generated.
pub fn build_new_token(
    token_id: Option<&str>,
    owner: &str,
    is_admin: bool,
    secret_phc: &str,
    expires_at: Option<&str>,
) -> CliResult<NewToken> {
    let expires_at = match expires_at {
        Some(raw) => parse_expiry(raw).map_err(ApplicationError::from)?,
        None => None,
    };
    if let Some(ts) = expires_at {
        ensure_future(ts, Utc::now().timestamp()).map_err(ApplicationError::from)?;
    }

    let token = NewToken {
        token_id: token_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        owner: owner.to_string(),
        is_admin,
        secret_phc: secret_phc.to_string(),
        expires_at,
    };
    token.validate().map_err(ApplicationError::from)?;
    Ok(token)
}

/// Build a partial update from the flags that were given.
///
/// Fails with "No updates specified" when no field flag was given.
pub fn build_update(
    token_id: &str,
    owner: Option<&str>,
    is_admin: Option<bool>,
    secret_phc: Option<&str>,
    expires_at: Option<&str>,
) -> CliResult<TokenUpdate> {
    let mut update = TokenUpdate::new(token_id);
    if let Some(owner) = owner {
        update = update.with_owner(owner);
    }
    if let Some(is_admin) = is_admin {
        update = update.with_admin(is_admin);
    }
    if let Some(phc) = secret_phc {
        update = update.with_secret_phc(phc);
    }
    if let Some(raw) = expires_at {
        let parsed = parse_expiry(raw).map_err(ApplicationError::from)?;
        update = update.with_expires_at(parsed);
    }
    update.validate().map_err(ApplicationError::from)?;
    Ok(update)
}

fn connect(
    container: &ServiceContainer,
    options: &RawOptions,
) -> CliResult<TokenService> {
    let endpoint = container
        .config_loader()
        .resolve(options, Requirement::AdminToken)?;
    Ok(container.token_service(endpoint)?)
}

#[instrument(skip_all, fields(token_id = %token.token_id))]
async fn _token_create(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
    token: NewToken,
) -> CliResult<()> {
    let service = connect(container, options)?;
    let record = service.create(token).await?;
    print_record(cli, &record, "Created token")
}

#[instrument(skip_all, fields(token_id = %update.token_id))]
async fn _token_update(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
    update: TokenUpdate,
) -> CliResult<()> {
    let service = connect(container, options)?;
    let record = service.update(update).await?;
    print_record(cli, &record, "Updated token")
}

#[instrument(skip(cli, container, options))]
async fn _token_get(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
    token_id: &str,
    field: Option<TokenField>,
) -> CliResult<()> {
    if field == Some(TokenField::SecretPhc) {
        return Err(CliError::InvalidArgs(
            "secret-phc is write-only and never returned by the service".to_string(),
        ));
    }
    let service = connect(container, options)?;
    let record = service.get(token_id).await?;

    match field {
        Some(field) => {
            let value = field_value(&record, field);
            if cli.json {
                print_json(&value)
            } else {
                output::info(&display_value(&value));
                Ok(())
            }
        }
        None if cli.json => print_json(&record),
        None => {
            output::token(&record);
            Ok(())
        }
    }
}

#[instrument(skip_all)]
async fn _token_list(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
) -> CliResult<()> {
    let service = connect(container, options)?;
    let records = service.list().await?;
    debug!(count = records.len(), "listed tokens");

    if cli.json {
        return print_json(&records);
    }
    for record in &records {
        output::info(&output::token_line(record));
    }
    if records.is_empty() && !cli.quiet {
        output::warning("no tokens");
    }
    Ok(())
}

#[instrument(skip(cli, container, options))]
async fn _token_revoke(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
    token_id: &str,
) -> CliResult<()> {
    let service = connect(container, options)?;
    match service.revoke(token_id).await? {
        Some(record) => print_record(cli, &record, "Revoked token"),
        None => {
            if cli.json {
                print_json(&serde_json::json!({ "tokenId": token_id, "revoked": true }))
            } else {
                if !cli.quiet {
                    output::success(&format!("Revoked token {token_id}"));
                }
                Ok(())
            }
        }
    }
}

#[instrument(skip_all)]
async fn _auth_check(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
) -> CliResult<()> {
    let service = connect(container, options)?;
    let status = service.check_auth().await?;
    if cli.json {
        return print_json(&status);
    }
    if !cli.quiet {
        output::auth_status(&status);
    }
    Ok(())
}

fn _config_show(cli: &Cli, container: &ServiceContainer, options: &RawOptions) -> CliResult<()> {
    let endpoint = container
        .config_loader()
        .resolve(options, Requirement::EndpointOnly)?;

    if cli.json {
        let token = endpoint.admin_token();
        return print_json(&serde_json::json!({
            "endpointUrl": endpoint.endpoint_url(),
            "adminToken": (!token.is_empty()).then(|| token.redacted()),
            "authPath": endpoint.auth_path(),
            "adminPath": endpoint.admin_path(),
        }));
    }
    output::info(&endpoint.to_redacted_toml()?.trim_end());
    Ok(())
}

fn _config_path(container: &ServiceContainer, options: &RawOptions) -> CliResult<()> {
    let location = container.config_loader().locate(options)?;
    match (location.file, location.dir) {
        (Some(file), _) => output::info(&file.display()),
        (None, Some(dir)) => {
            output::info(&dir.join(CONFIG_FILE_TOML).display());
            output::warning("config file does not exist yet (run `tokenadm config init`)");
        }
        (None, None) => {
            return Err(CliError::Usage(
                "cannot determine a config directory; pass --config-dir".to_string(),
            ))
        }
    }
    Ok(())
}

fn _config_init(
    cli: &Cli,
    container: &ServiceContainer,
    options: &RawOptions,
    force: bool,
) -> CliResult<()> {
    let dir = match &options.config_dir {
        Some(dir) => expand_path(dir),
        None => container.default_config_dir.clone().ok_or_else(|| {
            CliError::Usage("cannot determine a config directory; pass --config-dir".to_string())
        })?,
    };
    let fs = &container.fs;
    let path = dir.join(CONFIG_FILE_TOML);

    if !force {
        if let Some(existing) = [CONFIG_FILE_TOML, CONFIG_FILE_JSON]
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| fs.exists(candidate))
        {
            return Err(CliError::Usage(format!(
                "config already exists: {} (use --force to overwrite)",
                existing.display()
            )));
        }
    }

    fs.create_dir_all(&dir)
        .with_path_context("create config dir", &dir)?;
    fs.write(&path, &StoredConfig::template())
        .with_path_context("write config", &path)?;
    if !cli.quiet {
        output::success(&format!("Created config: {}", path.display()));
    }
    Ok(())
}

fn print_record(cli: &Cli, record: &TokenRecord, action: &str) -> CliResult<()> {
    if cli.json {
        return print_json(record);
    }
    if !cli.quiet {
        output::success(&format!("{action} {}", record.token_id));
        output::token(record);
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "render JSON output".to_string(),
            source: Box::new(e),
        }
    })?;
    output::info(&rendered);
    Ok(())
}

fn field_value(record: &TokenRecord, field: TokenField) -> serde_json::Value {
    match field {
        TokenField::Owner => serde_json::Value::from(record.owner.clone()),
        TokenField::IsAdmin => serde_json::Value::from(record.is_admin),
        TokenField::ExpiresAt => record
            .expires_at
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null),
        TokenField::SecretPhc => serde_json::Value::Null,
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.as_i64().map(format_expiry).unwrap_or_else(|| n.to_string()),
        serde_json::Value::Null => "never".to_string(),
        other => other.to_string(),
    }
}
