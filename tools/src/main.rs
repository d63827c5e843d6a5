//! shop-runner: headless runner for the shop simulation.
//!
//! Usage:
//!   shop-runner --seed 12345 --days 7 --db run.db
//!   shop-runner --seed 12345 --ipc-mode
//!
//! Batch mode restocks every catalog item before each day, trades the
//! day at 16x and prints a summary. IPC mode reads JSON commands from
//! stdin, one per line, and answers each with the shop state.

use anyhow::Result;
use shopkeep_core::{
    command::PlayerCommand,
    config::ShopConfig,
    engine::ShopEngine,
    event::SimEvent,
    shelf::DemandBand,
    stats::DailyStats,
    store::SimStore,
    types::Tick,
};
use std::env;
use std::io::{self, BufRead, Write};

/// Wall-clock milliseconds fed to each tick.
const TICK_MS: u64 = 100;
/// Upper bound on ticks per day in batch mode.
const MAX_TICKS_PER_DAY: u64 = 50_000;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
        #[serde(default = "default_tick_ms")]
        dt_ms: u64,
    },
    Command {
        command: PlayerCommand,
    },
    History,
    Quit,
}

fn default_tick_ms() -> u64 {
    TICK_MS
}

#[derive(serde::Serialize)]
struct UiState {
    tick: Tick,
    shop_time: String,
    open: bool,
    paused: bool,
    time_scale: u32,
    cash: f64,
    satisfaction: f64,
    reputation: f64,
    active_customers: usize,
    till_queue: usize,
    today: DailyStats,
    shelf: Vec<ShelfView>,
    events: Vec<SimEvent>,
}

#[derive(serde::Serialize)]
struct ShelfView {
    item_id: String,
    price: f64,
    quantity: u32,
    margin: f64,
    band: DemandBand,
}

/// Auto-restocking policy for batch runs.
struct RestockStrategy {
    /// Units of each item to hold across shelf and stockroom.
    target: u32,
    /// Shelf price as a multiple of wholesale cost.
    markup: f64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 7u32);
    let target = parse_arg(&args, "--restock-target", 8u32);
    let markup = parse_arg(&args, "--markup", 1.25f64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    if !ipc_mode {
        println!("Shopkeep: shop-runner");
        println!("  started:   {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
        println!("  seed:      {seed}");
        println!("  days:      {days}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = ShopConfig::load(data_dir)?;
    let store = if db == ":memory:" { SimStore::in_memory()? } else { SimStore::open(db)? };
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", uuid::Uuid::new_v4().simple());
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

    let mut engine = ShopEngine::build(run_id.clone(), seed, config, store)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        let strategy = RestockStrategy { target, markup };
        for _ in 0..days {
            restock(&mut engine, &strategy)?;
            run_day(&mut engine)?;
        }
        print_summary(&engine, &run_id)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut ShopEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    // Events not yet reported to the client.
    let mut pending: Vec<SimEvent> = engine.drain_events();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count, dt_ms } => {
                for _ in 0..count {
                    pending.extend(engine.tick(dt_ms)?);
                }
            }
            IpcCommand::Command { command } => {
                engine.submit_command(command);
            }
            IpcCommand::GetState => {}
            IpcCommand::History => {
                let history = serde_json::json!({
                    "days": engine.history(),
                    "overall": engine.overall(),
                });
                writeln!(stdout, "{history}")?;
                stdout.flush()?;
                continue;
            }
        }
        let state = build_ui_state(engine, std::mem::take(&mut pending));
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn build_ui_state(engine: &ShopEngine, events: Vec<SimEvent>) -> UiState {
    UiState {
        tick: engine.clock.current_tick,
        shop_time: engine.shop_time().format("%H:%M").to_string(),
        open: engine.is_open(),
        paused: engine.clock.paused,
        time_scale: engine.clock.time_scale,
        cash: engine.cash(),
        satisfaction: engine.satisfaction(),
        reputation: engine.reputation(),
        active_customers: engine.active_customers(),
        till_queue: engine.till().queue_len(),
        today: engine.today().clone(),
        shelf: engine
            .shelf()
            .listings()
            .iter()
            .map(|l| ShelfView {
                item_id: l.item_id.clone(),
                price: l.selling_price,
                quantity: l.quantity_on_shelf,
                margin: l.profit_per_item(),
                band: l.demand_band(),
            })
            .collect(),
        events,
    }
}

/// Top every catalog item up to the target, cheapest first, while cash
/// lasts, and put everything held on the shelf.
fn restock(engine: &mut ShopEngine, strategy: &RestockStrategy) -> Result<()> {
    let mut catalog = engine.config().catalog.clone();
    catalog.sort_by(|a, b| a.unit_cost.total_cmp(&b.unit_cost));

    for item in catalog {
        let id = item.item_id.as_str();
        let held = engine.shelf().quantity_of(id) + engine.inventory().quantity_of(id);
        let affordable = ((engine.cash() - 1e-9) / item.unit_cost).floor().max(0.0) as u32;
        let quantity = strategy.target.saturating_sub(held).min(affordable);
        if quantity > 0 {
            if let Err(e) = engine.buy_wholesale(id, quantity) {
                log::warn!("restock: could not buy {quantity} x {id}: {e}");
                continue;
            }
        }

        let stockroom = engine.inventory().quantity_of(id);
        if stockroom > 0 {
            let price = (item.unit_cost * strategy.markup * 100.0).floor() / 100.0;
            engine.place_on_shelf(id, stockroom, price)?;
        }
    }
    Ok(())
}

fn run_day(engine: &mut ShopEngine) -> Result<()> {
    engine.set_time_scale(16)?;
    engine.open_shop()?;
    for _ in 0..MAX_TICKS_PER_DAY {
        let events = engine.tick(TICK_MS)?;
        if let Some(SimEvent::DayEnded { stats, .. }) =
            events.iter().find(|e| matches!(e, SimEvent::DayEnded { .. }))
        {
            print_day(stats);
            return Ok(());
        }
    }
    anyhow::bail!("day {} did not end within {MAX_TICKS_PER_DAY} ticks", engine.today().day_number)
}

fn print_day(day: &DailyStats) {
    println!(
        "  day {:>3} | customers {:>3} ({:>3} buying) | revenue £{:>7.2} | expenses £{:>7.2} | profit £{:>6.2} | satisfaction {:>3.0}% | reputation {:>5.2}",
        day.day_number,
        day.customer_count,
        day.purchasing_customer_count,
        day.revenue,
        day.expenses,
        day.profit,
        day.satisfaction,
        day.reputation,
    );
}

fn print_summary(engine: &ShopEngine, run_id: &str) -> Result<()> {
    let overall = engine.overall();
    let transactions = engine.store_event_count("transaction_completed")?;
    let shortages = engine.store_event_count("stock_shortage")?;

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:            {run_id}");
    println!("  days traded:       {}", overall.days);
    println!("  final tick:        {}", engine.clock.current_tick);
    println!("  customers:         {}", overall.total_customers);
    println!("  purchasing:        {}", overall.total_purchasing_customers);
    println!("  transactions:      {transactions}");
    println!("  shortage events:   {shortages}");
    println!("  items unmet:       {}", overall.total_stock_shortage_per_item);
    println!("  avg satisfaction:  {:.1}%", overall.average_satisfaction);
    println!("  reputation:        {:.2}", engine.reputation());

    println!();
    println!("=== FINANCIAL SUMMARY ===");
    println!("  revenue:           £{:.2}", overall.total_revenue);
    println!("  expenses:          £{:.2}", overall.total_expenses);
    println!("  sales profit:      £{:.2}", overall.total_profit);
    println!("  cash on hand:      £{:.2}", engine.cash());
    println!(
        "  stock at cost:     £{:.2} ({} units in the stockroom)",
        engine.inventory().stock_value(),
        engine.inventory().total_units()
    );
    println!("  highest sale:      £{:.2}", overall.highest_transaction_value);
    match &overall.most_profitable_transaction {
        Some(best) => println!(
            "  best customer:     {} (£{:.2} spent, £{:.2} profit)",
            best.customer_name, best.value, best.profit
        ),
        None => println!("  best customer:     (no sales)"),
    }
    println!(
        "  most popular:      {}",
        overall.most_popular_item.as_deref().unwrap_or("-")
    );
    println!(
        "  least popular:     {}",
        overall.least_popular_item.as_deref().unwrap_or("-")
    );
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
