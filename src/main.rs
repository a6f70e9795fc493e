use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::proxy::ProxyGateway;
use crate::router::{respond, AppState};
use crate::sync::{spawn_scheduler, CancelToken, SyncOrchestrator};
use crate::upstream::{HttpUpstream, Upstream};
use anyhow::Context;
use astra::Server;
use clap::{Parser, Subcommand};
use std::sync::Arc;

mod auth;
mod config;
mod db;
mod domain;
mod errors;
mod proxy;
mod responses;
mod router;
mod sync;
mod upstream;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(
    name = "listing-sync",
    version,
    about = "Sync tenant property listings from the upstream API and proxy ad hoc requests",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (and the scheduler when an interval is configured).
    Serve,
    /// Run one sync pass and print the report.
    Sync,
    /// Mint a session token for a tenant.
    IssueSession {
        #[arg(long)]
        tenant: String,
    },
    /// Revoke a previously issued session token.
    RevokeSession {
        #[arg(long)]
        token: String,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;

    let db = Database::new(cfg.db_path.clone());
    init_db(&db).context("database initialization failed")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, db),
        Command::Sync => {
            let orchestrator = SyncOrchestrator::new(db, build_upstream(&cfg)?, cfg.sync_workers);
            let report = orchestrator.run(&CancelToken::new())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::IssueSession { tenant } => {
            let tenant_id = domain::TenantId::new(tenant)?;
            let now = chrono::Utc::now().timestamp();
            let token = db.with_conn(|conn| auth::create_session(conn, &tenant_id, now))?;
            println!("{token}");
            Ok(())
        }
        Command::RevokeSession { token } => {
            let now = chrono::Utc::now().timestamp();
            if db.with_conn(|conn| auth::revoke_session(conn, &token, now))? {
                tracing::info!("session revoked");
            } else {
                anyhow::bail!("no active session for that token");
            }
            Ok(())
        }
    }
}

fn build_upstream(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Upstream>> {
    let client = HttpUpstream::new(cfg.upstream_timeout).context("building upstream client")?;
    Ok(Arc::new(client))
}

fn serve(cfg: AppConfig, db: Database) -> anyhow::Result<()> {
    let upstream = build_upstream(&cfg)?;
    let cancel = CancelToken::new();
    let orchestrator = Arc::new(SyncOrchestrator::new(
        db.clone(),
        upstream.clone(),
        cfg.sync_workers,
    ));

    let scheduler = cfg
        .sync_interval
        .map(|interval| spawn_scheduler(orchestrator.clone(), interval, cancel.clone()));

    let state = AppState {
        db: db.clone(),
        sync: orchestrator,
        proxy: ProxyGateway::new(db, upstream),
        cancel: cancel.clone(),
    };

    tracing::info!(addr = %cfg.addr, workers = cfg.http_workers, "starting server");
    let result = Server::bind(&cfg.addr)
        .max_workers(cfg.http_workers)
        .serve(move |req, _info| respond(req, &state));

    cancel.cancel();
    if let Some(handle) = scheduler {
        if handle.join().is_err() {
            tracing::error!("sync scheduler panicked");
        }
    }

    result.context("server ended with error")?;
    tracing::info!("server shut down cleanly");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
