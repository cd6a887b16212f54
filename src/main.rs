//! Position ledger simulation.
//!
//! Walks one book through opens, adds, partial closes, reversals and price
//! ticks, printing the resulting snapshots.

use position_ledger::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Position Ledger Simulation");
    println!("Weighted-average cost, exact decimal pnl\n");

    scenario_1_open_and_close();
    scenario_2_reversal();
    scenario_3_short_reversal_with_history();
    scenario_4_mark_to_market();
    scenario_5_fees_and_portfolio();

    println!("\nAll simulations completed successfully.");
}

fn trade(symbol: &str, quantity: Decimal, price: Decimal, at: i64) -> TradeRecord {
    TradeRecord::new(symbol, quantity, price, Timestamp::from_millis(at))
}

fn print_view(view: &PositionView) {
    println!(
        "  {}: qty {} @ {} | realized {} | unrealized {} | total {}",
        view.symbol,
        view.quantity,
        view.avg_cost.map_or_else(|| "-".to_string(), |c| c.to_string()),
        view.realized_pnl,
        view.unrealized_pnl.map_or_else(|| "-".to_string(), |u| u.to_string()),
        view.total_pnl,
    );
}

/// Flat -> long -> flat.
fn scenario_1_open_and_close() {
    println!("Scenario 1: Open and Close\n");

    let book = PositionBook::default();

    let delta = book.submit(&trade("BTC-USD", dec!(1), dec!(50000), 1)).unwrap();
    println!("  Buy 1 BTC @ $50,000, realized {}", delta);
    print_view(&book.snapshot("BTC-USD").unwrap());

    let delta = book.submit(&trade("BTC-USD", dec!(-1), dec!(51000), 2)).unwrap();
    println!("  Sell 1 BTC @ $51,000, realized {}", delta);
    print_view(&book.snapshot("BTC-USD").unwrap());
    println!();
}

/// Long 2 -> sell 3 flips to short 1.
fn scenario_2_reversal() {
    println!("Scenario 2: Long to Short Reversal\n");

    let book = PositionBook::default();
    book.submit(&trade("BTC-USD", dec!(2), dec!(50000), 1)).unwrap();

    let outcome = book
        .apply_trade_detailed("BTC-USD", &trade("BTC-USD", dec!(-3), dec!(52000), 2))
        .unwrap();
    println!(
        "  Sell 3 BTC @ $52,000: {:?}, closed {}, realized {}",
        outcome.kind, outcome.closed_quantity, outcome.realized_delta
    );
    print_view(&book.snapshot("BTC-USD").unwrap());
    println!();
}

/// Restored short with prior realized pnl flips long.
fn scenario_3_short_reversal_with_history() {
    println!("Scenario 3: Short to Long with History\n");

    let book = PositionBook::default();
    book.restore(PositionState {
        symbol: "ETH-USD".to_string(),
        quantity: dec!(-1.5),
        avg_cost: Some(dec!(3000)),
        realized_pnl: dec!(100),
        total_fees: Decimal::ZERO,
        trade_count: 1,
        first_trade_at: Some(Timestamp::from_millis(0)),
        last_updated: Some(Timestamp::from_millis(0)),
    })
    .unwrap();

    let delta = book.submit(&trade("ETH-USD", dec!(2.5), dec!(2900), 1)).unwrap();
    println!("  Buy 2.5 ETH @ $2,900, realized {}", delta);
    print_view(&book.snapshot("ETH-USD").unwrap());
    println!();
}

/// Price ticks refresh unrealized pnl only.
fn scenario_4_mark_to_market() {
    println!("Scenario 4: Mark to Market\n");

    let book = PositionBook::default();
    book.submit(&trade("BTC-USD", dec!(2), dec!(50000), 1)).unwrap();

    for price in [dec!(52000), dec!(49000), dec!(50500)] {
        book.revalue("BTC-USD", price).unwrap();
        println!("  Tick ${}", price);
        print_view(&book.snapshot("BTC-USD").unwrap());
    }
    println!();
}

/// Fees come off realized pnl as they are paid. Portfolio sums across symbols.
fn scenario_5_fees_and_portfolio() {
    println!("Scenario 5: Fees and Portfolio\n");

    let book = PositionBook::default();
    book.submit(&trade("BTC-USD", dec!(0.5), dec!(50000), 1).with_fee(dec!(12.5)))
        .unwrap();
    book.submit(&trade("BTC-USD", dec!(0.5), dec!(51000), 2).with_fee(dec!(12.75)))
        .unwrap();
    book.submit(&trade("ETH-USD", dec!(-4), dec!(3000), 3).with_fee(dec!(6)))
        .unwrap();
    book.submit(&trade("ETH-USD", dec!(1), dec!(2950), 4).with_fee(dec!(1.5)))
        .unwrap();

    for result in book.revalue_all([("BTC-USD", dec!(52000)), ("ETH-USD", dec!(2900))]) {
        if let Err(e) = result.result {
            println!("  Revalue {} failed: {}", result.symbol, e);
        }
    }

    let portfolio = book.portfolio();
    for view in &portfolio.positions {
        print_view(view);
    }
    println!(
        "  Portfolio: {} open, realized {}, unrealized {}, total {}, fees {}",
        portfolio.open_positions,
        portfolio.realized_pnl,
        portfolio.unrealized_pnl,
        portfolio.total_pnl,
        portfolio.total_fees
    );
    println!("  JSON: {}", portfolio.to_json().unwrap());
}
