// Binder Ledger CLI
//
// Every command loads the ledger it needs, performs one logical operation
// (which persists itself) and exits. Prices come from a JSON quote snapshot
// passed with --quotes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use binder_ledger::{
    should_grade, BinderCardRecord, BinderRecorder, CardRecord, CollectionRecorder, Countable,
    DexTable, LedgerConfig, LedgerError, LedgerRecord, LedgerStore, PlacementRequest,
    PriceQuoteSource, PricedRecord, ProductRecord, QuantityChange, RefreshReport, Selector,
    StaticQuoteSource, Throttled,
};

#[derive(Parser)]
#[command(name = "binder-ledger")]
#[command(about = "Card collection ledger and binder organizer", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LedgerKind {
    Card,
    Product,
    Binder,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty ledger file (refuses to overwrite)
    Init { kind: LedgerKind },

    /// Price a card by url and add or update it
    AddCard {
        url: String,
        /// Owned copies (keeps the current count when omitted)
        #[arg(short, long)]
        quantity: Option<u32>,
        /// JSON quote snapshot
        #[arg(long)]
        quotes: PathBuf,
    },

    /// Price a sealed product by url and add or update it
    AddProduct {
        url: String,
        #[arg(long)]
        msrp: f64,
        /// Owned copies (keeps the current count when omitted)
        #[arg(short, long)]
        quantity: Option<u32>,
        #[arg(long)]
        quotes: PathBuf,
    },

    /// Place a card in the binder by name or catalog number
    Place {
        name_or_number: String,
        #[arg(long)]
        set: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        foil: bool,
        /// Ignored unless --foil is given
        #[arg(long)]
        full_art: bool,
    },

    /// Find an owned binder card by name or catalog number
    Locate { name_or_number: String },

    /// Look up a name or number in the reference table
    Dex { name_or_number: String },

    /// List ledger rows
    List { kind: LedgerKind },

    /// Remove one row by index or name
    Remove { kind: LedgerKind, selector: String },

    /// Add one copy, or set the owned count with --set
    Quantity {
        kind: LedgerKind,
        selector: String,
        #[arg(long)]
        set: Option<u32>,
    },

    /// Re-price every row (or one with --only)
    Refresh {
        kind: LedgerKind,
        #[arg(long)]
        quotes: PathBuf,
        /// Index or name of a single row
        #[arg(long)]
        only: Option<String>,
    },

    /// Check a PSA 10 price against the grading threshold
    Grade { psa10_price: f64 },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {:#}", err);
            if let Some(ledger_err) = err.downcast_ref::<LedgerError>() {
                for candidate in ledger_err.candidates() {
                    eprintln!("   {}", candidate);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = LedgerConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Init { kind } => run_init(&config, kind),
        Commands::AddCard {
            url,
            quantity,
            quotes,
        } => {
            let source = quote_source(&config, &quotes)?;
            let recorder = CollectionRecorder::new(&source, config.grading);
            let mut store = open::<CardRecord>(&config.card_ledger_path())?;

            let recorded = recorder.add_or_update(&mut store, &url, quantity)?;
            let card = &recorded.record;
            println!(
                "{} {} ({})",
                verb(recorded.outcome.is_created()),
                card.name,
                card.set
            );
            println!("   Ungraded: {}", money(card.ungraded_price));
            println!("   PSA 10:   {}", money(card.psa10_price));
            println!("   Quantity: {}", card.quantity);
            if card.grade_flag {
                println!("💎 Worth grading (threshold {:.2})", config.grading.threshold());
            }
            Ok(())
        }
        Commands::AddProduct {
            url,
            msrp,
            quantity,
            quotes,
        } => {
            let source = quote_source(&config, &quotes)?;
            let recorder = CollectionRecorder::new(&source, config.grading);
            let mut store = open::<ProductRecord>(&config.product_ledger_path())?;

            let recorded = recorder.add_or_update_product(&mut store, &url, msrp, quantity)?;
            let product = &recorded.record;
            println!(
                "{} {} ({})",
                verb(recorded.outcome.is_created()),
                product.name,
                product.set
            );
            println!("   MSRP:   {:.2}", product.msrp);
            println!("   Market: {}", money(product.market_price));
            println!("   Value:  {} for {}", money(product.holding_value()), product.quantity);
            Ok(())
        }
        Commands::Place {
            name_or_number,
            set,
            url,
            foil,
            full_art,
        } => {
            let recorder = binder_recorder(&config)?;
            let mut store = open::<BinderCardRecord>(&config.binder_ledger_path())?;

            let request = PlacementRequest {
                name_or_number,
                set,
                foil_flag: foil,
                full_art_flag: full_art,
                url,
            };
            let placed = recorder.place(&mut store, &request)?;

            println!(
                "{} {}",
                verb(placed.outcome.is_created()),
                placed.record.describe()
            );
            if let Some(replaced) = &placed.replaced {
                println!("   Replaced {}", replaced.describe());
            }
            println!("📍 {}", placed.placement().summary());
            print!("{}", placed.placement().render_grid());
            Ok(())
        }
        Commands::Locate { name_or_number } => {
            let recorder = binder_recorder(&config)?;
            let store = open::<BinderCardRecord>(&config.binder_ledger_path())?;

            let (index, record) = recorder.locate(&store, &name_or_number)?;
            println!("[{}] {}", index, record.describe());
            println!("📍 {}", record.placement().summary());
            print!("{}", record.placement().render_grid());
            Ok(())
        }
        Commands::Dex { name_or_number } => {
            let recorder = binder_recorder(&config)?;

            let (entry, placement) = recorder.lookup(&name_or_number)?;
            println!("#{} {}", entry.catalog_num, entry.canonical_name);
            println!("📍 {}", placement.summary());
            print!("{}", placement.render_grid());
            Ok(())
        }
        Commands::List { kind } => match kind {
            LedgerKind::Card => list::<CardRecord>(&config.card_ledger_path()),
            LedgerKind::Product => list::<ProductRecord>(&config.product_ledger_path()),
            LedgerKind::Binder => list_binder(&config.binder_ledger_path()),
        },
        Commands::Remove { kind, selector } => {
            let selector = Selector::parse(&selector);
            match kind {
                LedgerKind::Card => remove::<CardRecord>(&config.card_ledger_path(), &selector),
                LedgerKind::Product => {
                    remove::<ProductRecord>(&config.product_ledger_path(), &selector)
                }
                LedgerKind::Binder => {
                    remove::<BinderCardRecord>(&config.binder_ledger_path(), &selector)
                }
            }
        }
        Commands::Quantity {
            kind,
            selector,
            set,
        } => {
            let selector = Selector::parse(&selector);
            let change = match set {
                Some(quantity) => QuantityChange::Set(quantity),
                None => QuantityChange::Increment,
            };
            match kind {
                LedgerKind::Card => {
                    update_quantity::<CardRecord>(&config.card_ledger_path(), &selector, change)
                }
                LedgerKind::Product => update_quantity::<ProductRecord>(
                    &config.product_ledger_path(),
                    &selector,
                    change,
                ),
                LedgerKind::Binder => bail!("the binder keeps one card per slot; no quantities"),
            }
        }
        Commands::Refresh { kind, quotes, only } => {
            let source = quote_source(&config, &quotes)?;
            match kind {
                LedgerKind::Card => {
                    refresh::<CardRecord>(&config, &config.card_ledger_path(), &source, only)
                }
                LedgerKind::Product => {
                    refresh::<ProductRecord>(&config, &config.product_ledger_path(), &source, only)
                }
                LedgerKind::Binder => bail!("binder rows carry no prices to refresh"),
            }
        }
        Commands::Grade { psa10_price } => {
            let advisor = config.grading;
            let worth = should_grade(psa10_price, advisor.cost, advisor.multiplier);
            println!(
                "{} PSA 10 {:.2} vs threshold {:.2} (cost {:.2} × {})",
                if worth { "💎 Grade it:" } else { "⏭️  Skip:" },
                psa10_price,
                advisor.threshold(),
                advisor.cost,
                advisor.multiplier
            );
            Ok(())
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn verb(created: bool) -> &'static str {
    if created {
        "✅ Added"
    } else {
        "🔄 Updated"
    }
}

fn money(price: Option<f64>) -> String {
    match price {
        Some(price) => format!("{:.2}", price),
        None => "n/a".to_string(),
    }
}

fn open<R: LedgerRecord>(path: &Path) -> Result<LedgerStore<R>> {
    LedgerStore::open(path).with_context(|| format!("opening {} ledger {}", R::KIND, path.display()))
}

fn quote_source(config: &LedgerConfig, quotes: &Path) -> Result<Throttled<StaticQuoteSource>> {
    let snapshot = StaticQuoteSource::from_snapshot_file(quotes)
        .with_context(|| format!("reading quote snapshot {}", quotes.display()))?;
    Ok(Throttled::new(snapshot, config.refresh.delay()))
}

fn binder_recorder(config: &LedgerConfig) -> Result<BinderRecorder> {
    let path = config.dex_table_path();
    let dex = DexTable::from_csv_path(&path)
        .with_context(|| format!("loading reference table {}", path.display()))?;
    Ok(BinderRecorder::new(Arc::new(dex)))
}

fn run_init(config: &LedgerConfig, kind: LedgerKind) -> Result<()> {
    let path = match kind {
        LedgerKind::Card => {
            let path = config.card_ledger_path();
            LedgerStore::<CardRecord>::create(&path)?;
            path
        }
        LedgerKind::Product => {
            let path = config.product_ledger_path();
            LedgerStore::<ProductRecord>::create(&path)?;
            path
        }
        LedgerKind::Binder => {
            let path = config.binder_ledger_path();
            LedgerStore::<BinderCardRecord>::create(&path)?;
            path
        }
    };
    println!("✅ Created {}", path.display());
    Ok(())
}

fn list<R: LedgerRecord>(path: &Path) -> Result<()> {
    let store = open::<R>(path)?;
    println!("📒 {} {} rows in {}", store.len(), R::KIND, path.display());
    for (index, record) in store.records().iter().enumerate() {
        println!(
            "[{}] {} ({}) {}",
            index,
            record.name(),
            record.set_name(),
            record.url()
        );
    }
    Ok(())
}

fn list_binder(path: &Path) -> Result<()> {
    let store = open::<BinderCardRecord>(path)?;
    let mut rows: Vec<(usize, &BinderCardRecord)> = store.records().iter().enumerate().collect();
    rows.sort_by_key(|(_, record)| record.catalog_num);

    println!("🗂️  {} binder cards in {}", store.len(), path.display());
    for (index, record) in rows {
        println!(
            "[{}] {} → {}",
            index,
            record.describe(),
            record.placement().summary()
        );
    }
    Ok(())
}

fn remove<R: LedgerRecord>(path: &Path, selector: &Selector) -> Result<()> {
    let mut store = open::<R>(path)?;
    let removed = store.remove(selector)?;
    println!(
        "🗑️  Removed {} ({}) {}",
        removed.name(),
        removed.set_name(),
        removed.url()
    );
    Ok(())
}

fn update_quantity<R: Countable>(path: &Path, selector: &Selector, change: QuantityChange) -> Result<()> {
    let mut store = open::<R>(path)?;
    let quantity = store.update_quantity(selector, change)?;
    println!("✅ Quantity for {} is now {}", selector, quantity);
    Ok(())
}

fn refresh<R: PricedRecord>(
    config: &LedgerConfig,
    path: &Path,
    source: &dyn PriceQuoteSource,
    only: Option<String>,
) -> Result<()> {
    let mut store = open::<R>(path)?;

    if let Some(only) = only {
        let selector = Selector::parse(&only);
        let record = store.refresh_one(&selector, source, &config.grading)?;
        println!("🔄 Refreshed {} ({})", record.name(), record.set_name());
        return Ok(());
    }

    let report = store.bulk_refresh(source, &config.grading, &config.refresh.options())?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RefreshReport) {
    let icon = if report.is_clean() { "✅" } else { "⚠️ " };
    println!("{} {}", icon, report.summary());
    for failure in &report.failures {
        println!(
            "   [{}] {} {}: {}",
            failure.index, failure.name, failure.identity, failure.reason
        );
    }
}
