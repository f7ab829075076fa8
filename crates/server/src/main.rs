//! Travel cost operations entry point.
//!
//! Commands:
//! - `migrate` (default): run pending database migrations.
//! - `prune-parties`: delete parties no request refers to.
//! - `overview <ident>`: print the party overview as JSON.
//! - `document <request-id> <ident> [locale]`: print the confirmation document.

use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use travel_cost_common::{Config, Locale, LogFormat};
use travel_cost_core::{HtmlDocumentRenderer, HttpPersonDirectory, LifecycleService, OverviewService};
use travel_cost_db::{RequestRepository, RequestStore};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "travel_cost=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(config.logging.format);

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "migrate".to_string());

    let db = travel_cost_db::init(&config).await?;
    info!("Connected to database");

    match command.as_str() {
        "migrate" => {
            info!("Running database migrations...");
            travel_cost_db::migrate(&db).await?;
            info!("Migrations completed");
        }
        "prune-parties" => {
            let repo = RequestRepository::new(Arc::new(db));
            let removed = repo.remove_unreferenced_parties().await?;
            info!(removed, "Pruned unreferenced parties");
        }
        "overview" => {
            let ident = args.next().context("usage: travel-cost overview <ident>")?;
            let directory = HttpPersonDirectory::new(&config.person_directory)?;
            let service = OverviewService::new(
                Arc::new(RequestRepository::new(Arc::new(db))),
                Arc::new(directory),
                config.consent.self_consent_age,
            );
            let overview = service.overview(&ident).await?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        "document" => {
            let usage = "usage: travel-cost document <request-id> <ident> [locale]";
            let request_id: i32 = args.next().context(usage)?.parse().context(usage)?;
            let ident = args.next().context(usage)?;
            let locale = match args.next() {
                Some(tag) => Locale::from_tag(&tag).context("unknown locale")?,
                None => config.documents.default_locale,
            };

            let mut service = LifecycleService::new(
                Arc::new(RequestRepository::new(Arc::new(db))),
                Arc::new(HttpPersonDirectory::new(&config.person_directory)?),
                Arc::new(HtmlDocumentRenderer::default()),
            );
            service.set_consent_policy(config.consent.policy);

            let bytes = match service.confirmation_document(request_id, &ident, locale).await {
                Ok(bytes) => bytes,
                Err(err) => match err.rejection_reason() {
                    Some(reason) => bail!("{} ({reason})", reason.describe(locale)),
                    None => return Err(err.into()),
                },
            };
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        other => bail!("unknown command: {other}"),
    }

    Ok(())
}
