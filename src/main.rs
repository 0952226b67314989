//! Order book ledger simulation.
//!
//! Replays speculative blocks, a reorg, a funding accrual and a naughty-trader
//! scan against one shared ledger, printing what the ledger sees.

use orderbook_ledger::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const ETH_PERP: MarketId = MarketId(0);

fn main() -> Result<(), LedgerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Order Book Ledger Simulation");
    println!("Single Market, Speculative Blocks, Reorgs\n");

    let config = StaticConfig::default().with_market(
        ETH_PERP,
        MarketRiskConfig {
            min_size_requirement: dec!(0.5),
            max_liquidation_ratio: dec!(0.25),
        },
    );
    let ledger = SharedLedger::new(Ledger::with_config(Arc::new(config)));

    scenario_1_speculative_fill_and_reorg(&ledger)?;
    scenario_2_funding_accrual(&ledger)?;
    scenario_3_naughty_traders(&ledger)?;
    scenario_4_snapshot(&ledger)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn address(byte: u8) -> Address {
    Address([byte; 20])
}

fn price(value: Decimal) -> Price {
    Price::new_unchecked(value)
}

fn limit(trader: Address, size: Decimal, at: Decimal, salt: u128, block: BlockNumber) -> Order {
    Order::new(ETH_PERP, trader, SignedSize::new(size), price(at), salt, block, false)
}

/// A fill lands in a block that is later orphaned.
fn scenario_1_speculative_fill_and_reorg(ledger: &SharedLedger) -> Result<(), LedgerError> {
    println!("Scenario 1: Speculative Fill and Reorg\n");

    let (alice, bob) = (address(0xa1), address(0xb0));
    let ask = limit(alice, dec!(-2), dec!(1800), 1, 10);
    let bid = limit(bob, dec!(2), dec!(1800), 2, 10);
    let (ask_id, bid_id) = (ask.id(), bid.id());
    ledger.add(ask);
    ledger.add(bid);

    println!("  Alice asks 2 @ 1800, Bob bids 2 @ 1800");
    println!(
        "  Book: {} long, {} short\n",
        ledger.get_long_orders(ETH_PERP, None, None).len(),
        ledger.get_short_orders(ETH_PERP, None, None).len()
    );

    let orphan = BlockRef::new(11, BlockHash([0xaa; 32]));
    ledger.update_filled_base_asset_quantity(dec!(2), ask_id, orphan.number)?;
    ledger.update_filled_base_asset_quantity(dec!(2), bid_id, orphan.number)?;
    let overlay: HashMap<String, Decimal> = [(ask_id.to_hex(), dec!(2)), (bid_id.to_hex(), dec!(2))].into();
    ledger.update_in_progress_state(orphan, &overlay);

    println!("  Block 11 ({}) matches both orders", orphan.hash);
    println!("  Ask status: {:?}", ledger.get_order_by_id(ask_id).and_then(|o| o.status()));

    let unwound = ledger.unwind_in_progress_block(orphan);
    println!("  Block 11 orphaned, {} orders unwound", unwound);
    println!("  Ask status: {:?}", ledger.get_order_by_id(ask_id).and_then(|o| o.status()));

    let canonical = BlockRef::new(11, BlockHash([0xbb; 32]));
    ledger.update_filled_base_asset_quantity(dec!(1), ask_id, canonical.number)?;
    ledger.update_filled_base_asset_quantity(dec!(1), bid_id, canonical.number)?;
    let overlay: HashMap<String, Decimal> = [(ask_id.to_hex(), dec!(1)), (bid_id.to_hex(), dec!(1))].into();
    ledger.update_in_progress_state(canonical, &overlay);
    println!("  Block 11 ({}) matches 1 instead", canonical.hash);
    println!("  In-flight fill on ask: {}", ledger.in_progress_quantity(&ask_id.to_hex()));

    let pruned = ledger.accept(11, 1_700_000_000);
    println!("  Block 11 accepted, {} orders pruned, in-flight blocks: {}\n", pruned, ledger.get_in_progress_blocks().len());
    Ok(())
}

/// Funding accrues against the premium watermark until settled.
fn scenario_2_funding_accrual(ledger: &SharedLedger) -> Result<(), LedgerError> {
    println!("Scenario 2: Funding Accrual\n");

    let carol = address(0xc0);
    ledger.update_position(carol, ETH_PERP, SignedSize::new(dec!(3)), Quote::new(dec!(5400)), false);
    ledger.reset_unrealised_funding(ETH_PERP, carol, dec!(10));
    ledger.update_unrealised_funding(ETH_PERP, dec!(12.5))?;

    if let Some(position) = ledger.get_trader_info(carol).and_then(|t| t.get_position(ETH_PERP).cloned()) {
        println!("  Carol long 3, premium fraction 10 -> 12.5");
        println!("  Unrealised funding owed: {}\n", position.unrealised_funding);
    }
    Ok(())
}

/// Under-margined traders are flagged for liquidation or order cancellation.
fn scenario_3_naughty_traders(ledger: &SharedLedger) -> Result<(), LedgerError> {
    println!("Scenario 3: Naughty Trader Scan\n");

    let dave = address(0xd0);
    ledger.update_margin(dave, CollateralId::HUSD, Quote::new(dec!(40)))?;
    for (salt, at) in [(101, dec!(10)), (102, dec!(9)), (103, dec!(8))] {
        let order = limit(dave, dec!(-3), at, salt, 12);
        ledger.update_reserved_margin(dave, margin::order_reserved_margin(&order, dec!(0.2))?)?;
        ledger.add(order);
    }
    ledger.update_position(dave, ETH_PERP, SignedSize::new(dec!(-9)), Quote::new(dec!(90)), false);

    let erin = address(0xe0);
    ledger.update_margin(erin, CollateralId::HUSD, Quote::new(dec!(5)))?;
    ledger.update_position(erin, ETH_PERP, SignedSize::new(dec!(-10)), Quote::new(dec!(100)), false);

    ledger.update_last_price(ETH_PERP, price(dec!(10)));
    let oracle: PriceMap = [(ETH_PERP, price(dec!(11)))].into();

    println!("  Dave: short 9 @ 10, 40 margin, asks at 10/9/8");
    println!("  Erin: short 10 @ 10, 5 margin");
    println!("  Oracle 11, last trade 10\n");

    let naughty = ledger.get_naughty_traders(&oracle, &[ETH_PERP])?;
    for position in &naughty.liquidable {
        println!(
            "  Liquidate {} size {} (mf {}, max {})",
            position.trader,
            position.size,
            position.margin_fraction.round_dp(4),
            position.max_liquidation_size
        );
    }
    for (trader, orders) in &naughty.orders_to_cancel {
        let prices: Vec<String> = orders.iter().map(|o| o.price().to_string()).collect();
        println!("  Cancel for {}: orders at {}", trader, prices.join(", "));
    }
    println!();
    Ok(())
}

/// Snapshot to JSON and back into a fresh ledger.
fn scenario_4_snapshot(ledger: &SharedLedger) -> Result<(), LedgerError> {
    println!("Scenario 4: Snapshot and Restore\n");

    let json = ledger.get_order_book_data_copy().to_json()?;
    let restored = SharedLedger::new(Ledger::with_config(Arc::clone(ledger.read().config())));
    restored.load_from_snapshot(LedgerSnapshot::from_json(&json)?)?;

    println!("  Snapshot size: {} bytes", json.len());
    println!(
        "  Restored {} orders, {} traders",
        restored.get_all_orders().len(),
        restored.get_all_traders().len()
    );
    Ok(())
}
