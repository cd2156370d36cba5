use std::{process, sync::Arc};

use scm_audit_log::{
    application::{
        error::AppError,
        export::{self, export_filename},
        extensions::{ExtensionPoint, ExtensionRegistry},
        fetcher::AuditLogFetcher,
        links::{CapabilityLinks, parse_route},
        pagination::PageRequest,
        viewer::{AuditLogViewer, Submission, ViewOutcome},
    },
    cache::CacheConfig,
    config::{self, Command, ExportArgs, LinkArgs, Settings},
    infra::{
        client::{ScmClient, read_api_key},
        error::InfraError,
        telemetry,
    },
    presentation::views,
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const UNAVAILABLE_NOTICE: &str = "The audit log is not available for the current user.";
const EXPORT_UNAVAILABLE_NOTICE: &str = "Export is not available for the current user.";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    let key = read_api_key(&cli_args.auth)?;
    let client = Arc::new(ScmClient::new(&settings.server, key)?);
    let links = client.discover_links().await?;

    match cli_args.command {
        Command::List(args) => {
            let filters = args.filters.to_filters()?;
            let request = match args.page {
                Some(page) => PageRequest::new(page, filters),
                None => PageRequest::first(filters),
            };
            run_list(&settings, client, &links, request, args.json).await
        }
        Command::Route(args) => {
            let request = parse_route(&args.route, &settings.server.context_path)?;
            run_list(&settings, client, &links, request, args.json).await
        }
        Command::Export(args) => run_export(&client, &links, &args).await,
        Command::Link(args) => run_link(&settings, &links, &args),
    }
}

async fn run_list(
    settings: &Settings,
    client: Arc<ScmClient>,
    links: &CapabilityLinks,
    request: PageRequest,
    json: bool,
) -> Result<(), AppError> {
    let fetcher = AuditLogFetcher::new(client, &CacheConfig::from(&settings.cache));
    let viewer = AuditLogViewer::from_links(fetcher, links).ok_or(AppError::Unavailable)?;

    let view = match viewer.show(request).await {
        Submission::Committed(view) => view,
        Submission::Superseded { generation } => {
            return Err(AppError::unexpected(format!(
                "request {generation} was superseded"
            )));
        }
    };

    if json {
        let rendered = views::render_json(&view)
            .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
        println!("{rendered}");
    } else {
        print!("{}", views::render_text(&view));
    }

    match view.outcome {
        ViewOutcome::Loaded { .. } => {
            info!(route = %view.route(), "audit log page shown");
            Ok(())
        }
        ViewOutcome::Failed { failure } => Err(AppError::Fetch(failure)),
    }
}

async fn run_export(
    client: &ScmClient,
    links: &CapabilityLinks,
    args: &ExportArgs,
) -> Result<(), AppError> {
    let filters = args.filters.to_filters()?;
    let Some(link) = export::compose(links.csv_export.as_deref(), &filters) else {
        println!("{EXPORT_UNAVAILABLE_NOTICE}");
        return Ok(());
    };

    let body = client.download(&link).await?;
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .map_err(InfraError::from)?;
    let path = args
        .out_dir
        .join(export_filename(OffsetDateTime::now_utc()));
    tokio::fs::write(&path, &body)
        .await
        .map_err(InfraError::from)?;

    info!(path = %path.display(), bytes = body.len(), "audit log exported");
    println!("{}", path.display());
    Ok(())
}

fn run_link(settings: &Settings, links: &CapabilityLinks, args: &LinkArgs) -> Result<(), AppError> {
    let subject = args.subject.to_subject()?;
    let point = ExtensionPoint::for_subject(&subject);
    let registry = ExtensionRegistry::with_viewer();

    let mut shown = false;
    for component in registry.components_for(point, links) {
        if let Some(href) = component.href(&settings.server.context_path, Some(&subject))? {
            println!("{href}");
            shown = true;
        }
    }
    if !shown {
        println!("{UNAVAILABLE_NOTICE}");
    }
    Ok(())
}
