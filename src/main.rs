use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use ordersvc::application::service::{
    CreateOrderRequest, ItemRequest, ListOrdersRequest, OrderService, PaymentRequest,
};
use ordersvc::config::ServiceConfig;
use ordersvc::domain::payment::PaymentCredentials;
use ordersvc::domain::ports::OrderStoreRef;
use ordersvc::infrastructure::authorizer::SimulatedAuthorizer;
use ordersvc::infrastructure::in_memory::InMemoryOrderStore;
#[cfg(feature = "storage-rocksdb")]
use ordersvc::infrastructure::rocksdb::RocksDBStore;
use ordersvc::interfaces::csv::order_writer::OrderWriter;
use ordersvc::interfaces::jsonl::batch::BatchRunner;
use ordersvc::interfaces::jsonl::request_reader::RequestReader;
use ordersvc::telemetry;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "ORDERSVC_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "ORDERSVC_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a JSON-lines request script, one response per line
    Run { input: PathBuf },
    /// Create an order
    Create {
        #[arg(long)]
        user: String,
        /// Item as PRODUCT:QUANTITY:PRICE, repeatable
        #[arg(long = "item", required = true, value_parser = parse_item)]
        items: Vec<ItemRequest>,
    },
    /// Show one order
    Get { order_id: String },
    /// List a user's orders, newest first
    List {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 10)]
        page_size: i64,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Pay a pending order
    Pay {
        order_id: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "card")]
        method: String,
        #[arg(long, default_value = "")]
        card_number: String,
        #[arg(long, default_value = "")]
        card_holder: String,
        #[arg(long, default_value = "")]
        expiry_date: String,
        #[arg(long, default_value = "")]
        cvv: String,
    },
    /// Cancel a pending order
    Cancel { order_id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn parse_item(s: &str) -> std::result::Result<ItemRequest, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(price), Some(quantity), Some(product_id)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected PRODUCT:QUANTITY:PRICE, got '{}'", s));
    };
    Ok(ItemRequest {
        product_id: product_id.to_string(),
        quantity: quantity
            .parse()
            .map_err(|e| format!("invalid quantity '{}': {}", quantity, e))?,
        price: price
            .parse()
            .map_err(|e| format!("invalid price '{}': {}", price, e))?,
    })
}

fn open_store(db_path: Option<PathBuf>) -> Result<OrderStoreRef> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        info!(path = %path.display(), "Using RocksDB storage");
        return Ok(Arc::new(RocksDBStore::open(path)?));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    info!("Using in-memory storage");
    Ok(Arc::new(InMemoryOrderStore::new()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).into_diagnostic()?;
    writeln!(stdout).into_diagnostic()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(db_path) = cli.db_path {
        config.storage.db_path = Some(db_path);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    telemetry::init_tracing(&config.log_level);

    let store = open_store(config.storage.db_path.clone())?;
    let service = OrderService::new(store, Arc::new(SimulatedAuthorizer::new()), &config);
    service.check_ready().await?;

    match cli.command {
        Command::Run { input } => {
            let file = File::open(input).into_diagnostic()?;
            let requests = RequestReader::new(BufReader::new(file)).requests();
            let handled = BatchRunner::new(&service)
                .run(requests, io::stdout().lock())
                .await?;
            info!(handled, "Batch finished");
        }
        Command::Create { user, items } => {
            let view = service
                .create_order(CreateOrderRequest {
                    user_id: user,
                    items,
                })
                .await?;
            print_json(&view)?;
        }
        Command::Get { order_id } => print_json(&service.get_order(&order_id).await?)?,
        Command::List {
            user,
            page,
            page_size,
            format,
        } => {
            let page = service
                .list_orders(ListOrdersRequest {
                    user_id: user,
                    page,
                    page_size,
                })
                .await?;
            match format {
                Format::Json => print_json(&page)?,
                Format::Csv => OrderWriter::new(io::stdout().lock()).write_orders(&page.orders)?,
            }
        }
        Command::Pay {
            order_id,
            amount,
            method,
            card_number,
            card_holder,
            expiry_date,
            cvv,
        } => {
            let receipt = service
                .process_payment(PaymentRequest {
                    order_id,
                    amount,
                    payment_method: method,
                    credentials: PaymentCredentials {
                        card_number,
                        card_holder,
                        expiry_date,
                        cvv,
                    },
                })
                .await?;
            print_json(&receipt)?;
        }
        Command::Cancel { order_id } => print_json(&service.cancel_order(&order_id).await?)?,
    }

    Ok(())
}
