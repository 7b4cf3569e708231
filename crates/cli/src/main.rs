use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use cfacade_api::{FacadeClient, FacadeConfig, PollPolicy, ProvisionRequest, ReadinessProbe, load_config};
use cfacade_types::{AtomicServiceConfigId, AtomicServiceId, OperationResult, Ticket, WorkflowId};
use cfacade_util::http::status_error_message;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Drive workflow and atomic service lifecycles on the cloud facade.
#[derive(Debug, Parser)]
#[command(name = "cfacade", version)]
struct Cli {
    /// Facade base URL (overrides the config file and CFACADE_URL).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Skip TLS certificate verification for facade and probe requests.
    #[arg(long, global = true)]
    accept_invalid_certs: bool,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Authentication ticket, sent as the basic-auth password.
    #[arg(long, global = true, env = "CFACADE_TICKET", hide_env_values = true)]
    ticket: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a workflow and print its id.
    Create,
    /// Delete a workflow.
    Delete { workflow_id: String },
    /// Resolve the configuration id of an atomic service.
    ConfigId { atomic_service_id: String },
    /// Attach a service configuration to a workflow.
    Attach { config_id: String, workflow_id: String },
    /// Wait for an attached service to publish its HTTP endpoint.
    Endpoint {
        config_id: String,
        workflow_id: String,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Check once whether an endpoint answers with HTTP 200.
    Probe {
        /// Endpoint URL to request.
        endpoint: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Create a workflow, attach a service and wait for its endpoint.
    Provision {
        atomic_service_id: String,
        #[command(flatten)]
        poll: PollArgs,
        /// Probe the endpoint with these credentials once it resolves.
        #[arg(long, requires = "password")]
        username: Option<String>,
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
}

#[derive(Debug, Args)]
struct PollArgs {
    /// Maximum number of redirection lookups.
    #[arg(long, default_value_t = 60)]
    max_attempts: u32,
    /// Delay after the first placeholder response, in milliseconds.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
    /// Upper bound for the growing delay, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    max_interval_ms: u64,
    /// Give up after this many seconds regardless of attempts left.
    #[arg(long)]
    deadline_secs: Option<u64>,
}

impl PollArgs {
    fn policy(&self) -> PollPolicy {
        let policy = PollPolicy::new(self.max_attempts).with_backoff(
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.max_interval_ms),
        );
        match self.deadline_secs {
            Some(secs) => policy.with_deadline(Duration::from_secs(secs)),
            None => policy,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = build_config(&cli)?;
    let facade = || -> Result<(FacadeClient, Ticket)> {
        let ticket = cli
            .ticket
            .as_deref()
            .map(Ticket::new)
            .context("a ticket is required (--ticket or CFACADE_TICKET)")?;
        let client = FacadeClient::new(config.clone()).context("build facade client")?;
        debug!(base_url = client.base_url(), "facade client ready");
        Ok((client, ticket))
    };

    match &cli.command {
        Command::Create => {
            let (client, ticket) = facade()?;
            emit(client.create_workflow(&ticket).await)
        }
        Command::Delete { workflow_id } => {
            let (client, ticket) = facade()?;
            emit(client.delete_workflow(&WorkflowId::new(workflow_id.as_str()), &ticket).await)
        }
        Command::ConfigId { atomic_service_id } => {
            let (client, ticket) = facade()?;
            emit(
                client
                    .resolve_config_id(&AtomicServiceId::new(atomic_service_id.as_str()), &ticket)
                    .await,
            )
        }
        Command::Attach { config_id, workflow_id } => {
            let (client, ticket) = facade()?;
            emit(
                client
                    .attach_service(
                        &AtomicServiceConfigId::new(config_id.as_str()),
                        &WorkflowId::new(workflow_id.as_str()),
                        &ticket,
                    )
                    .await,
            )
        }
        Command::Endpoint {
            config_id,
            workflow_id,
            poll,
        } => {
            let (client, ticket) = facade()?;
            let cancel = cancel_on_ctrl_c();
            emit(
                client
                    .poll_endpoint(
                        &AtomicServiceConfigId::new(config_id.as_str()),
                        &WorkflowId::new(workflow_id.as_str()),
                        &ticket,
                        &poll.policy(),
                        &cancel,
                    )
                    .await,
            )
        }
        Command::Probe {
            endpoint,
            username,
            password,
        } => {
            let probe = ReadinessProbe::new(&config).context("build readiness probe")?;
            let ready = probe.check(endpoint, username, password).await;
            print_json(&json!({ "ready": ready }))?;
            Ok(if ready { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Provision {
            atomic_service_id,
            poll,
            username,
            password,
        } => {
            let (client, ticket) = facade()?;
            let probe = ReadinessProbe::new(&config).context("build readiness probe")?;
            let mut request = ProvisionRequest::new(poll.policy());
            if let (Some(username), Some(password)) = (username, password) {
                request = request.with_probe(username.as_str(), password.as_str());
            }
            let cancel = cancel_on_ctrl_c();
            emit(
                client
                    .provision_service(&AtomicServiceId::new(atomic_service_id.as_str()), &ticket, &request, &probe, &cancel)
                    .await,
            )
        }
    }
}

fn build_config(cli: &Cli) -> Result<FacadeConfig> {
    let mut config = load_config().context("load facade configuration")?;
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    if cli.accept_invalid_certs {
        config.accept_invalid_certs = true;
    }
    if let Some(secs) = cli.timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

/// Cancel the returned token when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling");
            trigger.cancel();
        }
    });
    cancel
}

/// Print the payload or the failure report; failures exit with status 1.
fn emit<T: Serialize>(result: OperationResult<T>) -> Result<ExitCode> {
    match result {
        Ok(payload) => {
            print_json(&json!({ "result": payload }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if let Some(hint) = failure.status().and_then(status_error_message) {
                eprintln!("{hint}");
            }
            print_json(&json!({ "error": failure }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
