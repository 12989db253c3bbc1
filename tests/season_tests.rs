//! End-to-end season scenarios
//!
//! Drives the producer with scripted randomness so block timing is exact.

use season_core::config::{EmissionConfig, LedgerConfig, ProductionConfig, SimConfig};
use season_core::consensus::EmissionsSchedule;
use season_core::events::{Event, EventBus};
use season_core::ledger::{MemoryLedger, RewardLedger};
use season_core::mining::{BlockProducer, ProduceOutcome, ScriptedEntropy};
use season_core::node::SeasonNode;

const HOUR: u64 = 3_600_000;

fn producer_with(
    emission: EmissionConfig,
    production: ProductionConfig,
    entropy: ScriptedEntropy,
) -> BlockProducer<MemoryLedger, ScriptedEntropy> {
    BlockProducer::new(
        emission,
        production,
        MemoryLedger::new(LedgerConfig::default()),
        entropy,
        EventBus::new(),
        0,
    )
    .unwrap()
}

/// 1000 blocks of 10 s split into 4 epochs of 250
fn short_season(total: f64) -> EmissionConfig {
    EmissionConfig::new(10_000.0 / 86_400.0, 10.0, total, 4)
}

#[test]
fn test_default_schedule_scenario() {
    let schedule = EmissionsSchedule::new(EmissionConfig::default()).unwrap();
    assert_eq!(schedule.total_blocks(), 60_480);
    assert_eq!(schedule.epoch_length(), 15_120);
    assert_eq!(schedule.series_sum(), 1.875);

    let r0 = 210_000_000.0 / (15_120.0 * 1.875);
    assert!((schedule.current_reward(0) - 7_407.41).abs() < 0.01);
    assert!((schedule.current_reward(15_120) - 3_703.70).abs() < 0.01);
    assert!((schedule.current_reward(30_240) - 1_851.85).abs() < 0.01);
    assert!((schedule.current_reward(45_360) - 925.93).abs() < 0.01);
    assert!((schedule.r0() - r0).abs() < 1e-9);
}

#[test]
fn test_trial_controls_arrival() {
    // hit, miss, miss, hit ... with no other draws consumed on a miss
    let mut producer = producer_with(
        EmissionConfig::default(),
        ProductionConfig {
            max_listed_transactions: 0,
            ..ProductionConfig::default()
        },
        ScriptedEntropy::new(vec![0.05, 0.0, 0.0, 0.0, 0.5, 0.5]),
    );

    // tick 1: trial 0.05 hits; fees 0.0, tx count 0.0, orphan 0.0
    assert!(producer.tick(1_000).block.is_some());
    // ticks 2 and 3: 0.5 misses twice
    assert!(producer.tick(2_000).block.is_none());
    assert!(producer.tick(3_000).block.is_none());
    // tick 4: the script wraps around to 0.05
    assert!(producer.tick(4_000).block.is_some());
    assert_eq!(producer.chain().height, 2);
}

#[test]
fn test_full_season_with_remainder() {
    // 1003 blocks: three of them do not fit the equal-epoch formula
    let emission = EmissionConfig::new(10_030.0 / 86_400.0, 10.0, 1_000_000.0, 4);
    let mut producer = producer_with(
        emission,
        ProductionConfig::default(),
        ScriptedEntropy::constant(0.0),
    );
    assert_eq!(producer.schedule().total_blocks(), 1_003);

    let mut now = 0;
    let mut subsidies = Vec::new();
    while let ProduceOutcome::Produced(block) = producer.produce_block(now) {
        subsidies.push(block.subsidy);
        now += 10_000;
    }

    let emitted = producer.schedule().emitted_total();
    assert!((emitted - 1_000_000.0).abs() < 1e-6);
    assert!(emitted <= 1_000_000.0);
    // the budget runs out inside the longer final epoch, before the cap
    assert!(producer.chain().height < 1_003);
    assert!(subsidies.windows(2).all(|w| w[1] <= w[0]));

    let telemetry = producer.telemetry(now);
    assert!(telemetry.season_ended);
    assert_eq!(telemetry.current_reward, 0.0);
    assert_eq!(telemetry.emissions.remaining, 0.0);
}

#[test]
fn test_season_end_is_terminal() {
    let mut producer = producer_with(
        short_season(5_000.0),
        ProductionConfig::default(),
        ScriptedEntropy::constant(0.0),
    );
    let mut now = 0;
    while !producer.is_season_ended() {
        now += 1_000;
        producer.tick(now);
    }
    let height = producer.chain().height;
    let emitted = producer.schedule().emitted_total();

    for _ in 0..10 {
        now += 1_000;
        let report = producer.tick(now);
        assert!(report.block.is_none());
        assert!(report.telemetry.season_ended);
        assert_eq!(report.telemetry.current_reward, 0.0);
    }
    assert_eq!(producer.chain().height, height);
    assert_eq!(producer.schedule().emitted_total(), emitted);
}

#[test]
fn test_display_buffer_is_bounded() {
    let mut producer = producer_with(
        short_season(5_000.0),
        ProductionConfig {
            max_blocks_in_memory: 50,
            ..ProductionConfig::default()
        },
        ScriptedEntropy::constant(0.0),
    );
    for i in 1..=120 {
        producer.produce_block(i * 10_000);
    }

    assert_eq!(producer.chain().height, 120);
    assert_eq!(producer.chain().buffered_len(), 50);
    assert!(producer.block_at(70).is_none());
    assert_eq!(producer.block_at(71).map(|b| b.height), Some(71));

    let page = producer.recent_blocks(None, 100);
    assert_eq!(page.blocks.len(), 50);
    assert_eq!(page.blocks[0].height, 120);
    assert!(!page.has_more);
    // accounting is independent of the buffer
    let expected: f64 = (0..120).map(|h| producer.schedule().current_reward(h)).sum();
    assert!((producer.schedule().emitted_total() - expected).abs() < 1e-9);
}

#[test]
fn test_average_block_time_tracks_arrivals() {
    let mut producer = producer_with(
        short_season(5_000.0),
        ProductionConfig::default(),
        ScriptedEntropy::constant(0.0),
    );
    for i in 1..=200 {
        producer.produce_block(i * 30_000);
    }
    // EMA from 10 s towards a steady 30 s
    assert!((producer.chain().avg_block_time - 30.0).abs() < 0.01);
}

#[test]
fn test_slow_window_lowers_difficulty_by_at_most_four() {
    let mut producer = producer_with(
        EmissionConfig::default(),
        ProductionConfig {
            difficulty_retarget_blocks: 10,
            ..ProductionConfig::default()
        },
        ScriptedEntropy::constant(0.0),
    );
    // 10 blocks an hour apart: far slower than 100 s expected
    for i in 1..=10 {
        producer.produce_block(i * HOUR);
    }
    assert!((producer.chain().difficulty - 250_000.0).abs() < 1e-6);

    // next window exactly on target
    for i in 1..=10 {
        producer.produce_block(10 * HOUR + i * 10_000);
    }
    assert!((producer.chain().difficulty - 250_000.0).abs() < 1e-6);
}

#[test]
fn test_decayed_rigs_earn_less() {
    let mut producer = producer_with(
        EmissionConfig::default(),
        ProductionConfig::default(),
        ScriptedEntropy::constant(0.0),
    );
    let ledger = producer.ledger_mut();
    ledger.buy_rig("fresh", "golden-dragon", 0.1, None, 40 * HOUR).unwrap();
    ledger.buy_rig("worn", "golden-dragon", 0.1, None, 0).unwrap();

    // worn rig is at quality 80 by now
    let now = 40 * HOUR;
    assert!(
        (producer.ledger().participant_weight("worn", now)
            - 0.8 * producer.ledger().participant_weight("fresh", now))
        .abs()
            < 1e-9
    );

    producer.produce_block(now);
    let fresh = producer.ledger().participant("fresh").unwrap().total_earned;
    let worn = producer.ledger().participant("worn").unwrap().total_earned;
    assert!((worn / fresh - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_subscribers_receive_blocks_and_telemetry() {
    let mut producer = producer_with(
        EmissionConfig::default(),
        ProductionConfig::default(),
        ScriptedEntropy::constant(0.0),
    );
    let mut sub = producer.events().subscribe(16);
    let closed = producer.events().subscribe(16);
    drop(closed.receiver);

    producer.tick(1_000);
    producer.tick(2_000);

    let mut blocks = 0;
    let mut telemetry = 0;
    for _ in 0..4 {
        match sub.receiver.recv().await {
            Some(Event::Block(block)) => {
                blocks += 1;
                assert_eq!(block.height, blocks);
            }
            Some(Event::Telemetry(snapshot)) => {
                telemetry += 1;
                assert_eq!(snapshot.height, telemetry);
            }
            None => panic!("bus closed"),
        }
    }
    assert_eq!((blocks, telemetry), (2, 2));
    assert_eq!(producer.events().subscriber_count(), 1);
}

#[tokio::test]
async fn test_node_serves_consistent_telemetry() {
    let mut config = SimConfig::default();
    config.emission = short_season(5_000.0);
    let node = SeasonNode::new(&config, Box::new(ScriptedEntropy::constant(0.0))).unwrap();
    let handle = node.handle();

    let mut last = 0;
    for _ in 0..5 {
        let report = handle.tick().await;
        assert_eq!(report.telemetry, handle.telemetry());
        assert!(report.telemetry.height > last);
        last = report.telemetry.height;
    }

    let emitted = handle
        .with_producer(|producer, _| producer.schedule().emitted_total())
        .await;
    assert_eq!(handle.telemetry().emissions.emitted_total, emitted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ticks_never_over_emit() {
    let total = 5_000.0;
    let mut config = SimConfig::default();
    config.emission = short_season(total);
    let node = SeasonNode::new(&config, Box::new(ScriptedEntropy::constant(0.0))).unwrap();
    let handle = node.handle();

    // 16 x 80 ticks comfortably outlast the 1000-block season
    let mut tasks = Vec::new();
    for worker in 0..16 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            let mut heights = Vec::new();
            for round in 0..80 {
                let report = handle.tick().await;
                assert!(report.telemetry.emissions.emitted_total <= total);
                if let Some(block) = report.block {
                    heights.push(block.height);
                }

                if round % 10 == 0 {
                    let buyer = format!("miner-{}", worker);
                    let emitted = handle
                        .with_producer(move |producer, now| {
                            let reward = producer.current_reward();
                            let _ = producer
                                .ledger_mut()
                                .buy_rig(&buyer, "antminer-s9", reward, None, now);
                            producer.schedule().emitted_total()
                        })
                        .await;
                    assert!(emitted <= total);
                }
                tokio::task::yield_now().await;
            }
            heights
        }));
    }

    let mut heights = Vec::new();
    for task in tasks {
        heights.extend(task.await.unwrap());
    }
    heights.sort_unstable();

    assert_eq!(heights.first(), Some(&1));
    assert!(heights.windows(2).all(|w| w[1] == w[0] + 1));

    let (height, emitted, ended) = handle
        .with_producer(|producer, _| {
            (
                producer.chain().height,
                producer.schedule().emitted_total(),
                producer.is_season_ended(),
            )
        })
        .await;
    assert!(ended);
    assert_eq!(heights.last(), Some(&height));
    assert!(emitted <= total);
    assert!((emitted - total).abs() < 1e-6);
}
