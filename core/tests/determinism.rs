//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Two shops, same seed, same player actions.
//! They must produce byte-identical event logs.

use shopkeep_core::{command::PlayerCommand, engine::ShopEngine};

fn build_engine(seed: u64) -> ShopEngine {
    let run_id = format!("det-test-{seed}");
    ShopEngine::build_test(run_id, seed).expect("build test engine")
}

/// Stock up, trade one full day at 16x, restock, trade half of the next.
fn play(engine: &mut ShopEngine) {
    for (item, qty, price) in [("Bread", 12, 1.25), ("Milk", 12, 1.00), ("Tea", 6, 2.30)] {
        engine.submit_command(PlayerCommand::BuyWholesale { item_id: item.into(), quantity: qty });
        engine.submit_command(PlayerCommand::PlaceOnShelf {
            item_id: item.into(),
            quantity: qty,
            price,
        });
    }
    engine.submit_command(PlayerCommand::SetTimeScale { multiplier: 16 });
    engine.submit_command(PlayerCommand::OpenShop);
    engine.run_ticks(1_000, 100).expect("day one");

    engine.submit_command(PlayerCommand::BuyWholesale { item_id: "Bread".into(), quantity: 5 });
    engine.submit_command(PlayerCommand::PlaceOnShelf {
        item_id: "Bread".into(),
        quantity: 5,
        price: 1.20,
    });
    engine.submit_command(PlayerCommand::SetTimeScale { multiplier: 16 });
    engine.submit_command(PlayerCommand::OpenShop);
    engine.run_ticks(200, 100).expect("day two");
}

/// Event payloads in append order, without the run header (which names
/// the run and so differs between seeds by construction).
fn collect_event_log(engine: &ShopEngine) -> Vec<String> {
    engine
        .store_events_for_run()
        .expect("read events")
        .into_iter()
        .filter(|e| e.event_type != "run_initialized")
        .map(|e| e.payload)
        .collect()
}

#[test]
fn same_seed_produces_identical_event_logs() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

    let mut engine_a = build_engine(SEED);
    let mut engine_b = build_engine(SEED);
    play(&mut engine_a);
    play(&mut engine_b);

    let log_a = collect_event_log(&engine_a);
    let log_b = collect_event_log(&engine_b);

    assert!(
        log_a.iter().any(|p| p.contains("transaction_completed")),
        "the scripted day should produce sales"
    );
    assert_eq!(
        log_a.len(), log_b.len(),
        "Event log lengths differ: {} vs {}",
        log_a.len(), log_b.len()
    );
    for (i, (a, b)) in log_a.iter().zip(log_b.iter()).enumerate() {
        assert_eq!(a, b, "Event log diverged at entry {i}:\n  A: {a}\n  B: {b}");
    }
}

#[test]
fn different_seeds_produce_different_logs() {
    let mut engine_a = build_engine(42);
    let mut engine_b = build_engine(99);
    play(&mut engine_a);
    play(&mut engine_b);

    let log_a = collect_event_log(&engine_a);
    let log_b = collect_event_log(&engine_b);

    let any_different =
        log_a.len() != log_b.len() || log_a.iter().zip(log_b.iter()).any(|(a, b)| a != b);
    assert!(any_different, "Different seeds produced identical logs; seed is not being used");
}
