//! Subcommand dispatch

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use flowcat_auth::RequestContext;
use flowcat_core::{CatalogConfig, FlowCatalog, FlowConfigApi, StoreConfig};
use flowcat_spec::FlowSpec;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store used when neither the configuration nor `--store` names one
const DEFAULT_STORE_DIR: &str = ".flowcat";

const CLI_ORIGIN: &str = "flowcat-cli";

/// Run the selected subcommand and render its result
pub(crate) async fn run(matches: &ArgMatches) -> Result<String> {
    let Some((command, args)) = matches.subcommand() else {
        bail!("no subcommand given");
    };

    let config = load_config(args)?;
    let ctx = RequestContext::user(current_user(args), CLI_ORIGIN);

    let catalog = Arc::new(FlowCatalog::from_config(&config).context("building catalog")?);
    catalog.start().await.context("starting catalog")?;
    let api = FlowConfigApi::new(Arc::clone(&catalog));

    tracing::debug!(command, "Dispatching");
    let output = dispatch(&api, command, args, &ctx).await;
    catalog.stop().await?;
    output
}

async fn dispatch(
    api: &FlowConfigApi,
    command: &str,
    args: &ArgMatches,
    ctx: &RequestContext,
) -> Result<String> {
    let value = match command {
        "create" => serde_json::to_value(api.create_flow(read_spec(args)?, ctx).await?)?,
        "update" => serde_json::to_value(api.update_flow(read_spec(args)?, ctx).await?)?,
        "get" => {
            let (group, name) = flow_id(args)?;
            serde_json::to_value(api.get_flow(group, name).await?)?
        }
        "patch" => {
            let (group, name) = flow_id(args)?;
            let patch = args
                .get_one::<String>("patch")
                .context("missing patch document")?;
            serde_json::to_value(api.partial_update_flow(group, name, patch, ctx).await?)?
        }
        "delete" => {
            let (group, name) = flow_id(args)?;
            api.delete_flow(group, name, ctx).await?;
            serde_json::json!({ "deleted": format!("{group}/{name}") })
        }
        "run" => {
            let (group, name) = flow_id(args)?;
            serde_json::to_value(api.run_immediately(group, name, ctx).await?)?
        }
        "list" => serde_json::to_value(api.list_flows().await?)?,
        other => bail!("unknown command '{other}'"),
    };
    render(&value)
}

fn render(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn load_config(args: &ArgMatches) -> Result<CatalogConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => CatalogConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CatalogConfig::default(),
    };

    if let Some(root) = args.get_one::<PathBuf>("store") {
        config = config.with_store(StoreConfig::Fs { root: root.clone() });
    } else if config.store == StoreConfig::Memory {
        // A memory store would forget everything when the process exits
        config = config.with_store(StoreConfig::Fs {
            root: PathBuf::from(DEFAULT_STORE_DIR),
        });
    }
    Ok(config)
}

fn current_user(args: &ArgMatches) -> String {
    args.get_one::<String>("user")
        .cloned()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "anonymous".to_string())
}

fn flow_id(args: &ArgMatches) -> Result<(&str, &str)> {
    let group = args.get_one::<String>("group").context("missing group")?;
    let name = args.get_one::<String>("name").context("missing name")?;
    Ok((group, name))
}

fn read_spec(args: &ArgMatches) -> Result<FlowSpec> {
    let path = args.get_one::<PathBuf>("file").context("missing --file")?;
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("parsing flow spec {}", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}
