use anyhow::{bail, Context, Result};
use std::{
    fs::{self, File, OpenOptions},
    path::Path,
    sync::Mutex,
};

use itemstore_core::{
    config::{self, AppConfig},
    Identity, ItemStore, Product, RecordId, Service,
};
use tracing_subscriber::{prelude::*, EnvFilter};

const USAGE: &str = "usage: itemstore [list | seed | remove <id>]";

fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load_from(&config_path)?;
    tracing::debug!(?config, "configuration loaded");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut store = ItemStore::from_config(&config)?;
    let outcome = run(&mut store, &config, &args);
    store.dispose()?;
    outcome
}

fn run(store: &mut ItemStore, config: &AppConfig, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str).unwrap_or("list") {
        "list" => {
            load_existing(store, config)?;
            print_records(store)
        }
        "seed" => {
            store.add(Product::new("Laptop", 1500.0)?)?;
            store.add(Service::new("Hosting", 10.0, 12)?)?;
            store.add(Product::new("Mouse", 25.99)?)?;
            store.save(&config.data_file)?;
            println!(
                "Saved {} records to {}",
                store.len()?,
                config.data_file.display()
            );
            print_records(store)
        }
        "remove" => {
            let Some(raw) = args.get(1) else {
                bail!(USAGE);
            };
            let id: RecordId = raw
                .parse()
                .with_context(|| format!("invalid record id '{raw}'"))?;
            load_existing(store, config)?;
            if store.remove(id)? {
                store.save(&config.data_file)?;
                println!("Removed {id}");
            } else {
                println!("No record with id {id}");
            }
            Ok(())
        }
        _ => bail!(USAGE),
    }
}

fn load_existing(store: &mut ItemStore, config: &AppConfig) -> Result<()> {
    if config.data_file.exists() {
        store
            .load(&config.data_file)
            .with_context(|| format!("failed to load {}", config.data_file.display()))?;
    }
    Ok(())
}

fn print_records(store: &ItemStore) -> Result<()> {
    println!("Records:");
    for record in store.iter()? {
        println!("  {record}");
    }

    println!("Products by price:");
    for product in store.products_sorted()? {
        println!("  {:>10.2}  {}", product.price(), product.name());
    }

    println!("Services:");
    for service in store.records_of_type::<Service>()? {
        println!(
            "  {}: {} h x {:.2} = {:.2}",
            service.name(),
            service.hours(),
            service.hourly_rate(),
            service.total()
        );
    }
    Ok(())
}

/// Diagnostics go to stderr and to `<config dir>/logs/itemstore.log`;
/// stdout stays reserved for command output.
fn init_logging() -> Result<()> {
    let log_file = open_log_file(&config::config_root().join("logs"))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("itemstore_core=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(())
}

fn open_log_file(log_dir: &Path) -> Result<File> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("itemstore.log");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))
}
