use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use amm_snapshot::model::{Felt, OptionSide, OptionType};
use amm_snapshot::output::{self, Format, Sink};
use amm_snapshot::rpc::{Entrypoint, RemoteQueryClient, RpcError};
use amm_snapshot::{SnapshotAggregator, SnapshotError};

const E18: u128 = 1_000_000_000_000_000_000;
const TWO_POW_61: u128 = 1 << 61;
const TWO_POW_60: u128 = 1 << 60;

// ── Mock AMM ────────────────────────────────────────────────────────

struct MockOption {
    side: u64,
    maturity: u64,
    strike: u128,
    option_type: u64,
    position: Felt,
}

struct MockPool {
    address: u64,
    locked: u128,
    unlocked: u128,
    balance: u128,
    value_position: u128,
    options: Vec<MockOption>,
    /// (maturity, strike) → volatility
    volatility: HashMap<(u64, u128), u128>,
}

/// An in-memory AMM answering the view calls the pipeline makes.
/// Records every call and can fail a chosen one.
#[derive(Default)]
struct MockAmm {
    pools: Vec<MockPool>,
    log: Mutex<Vec<(String, Vec<Felt>)>>,
    fail_on: Option<(&'static str, u64)>,
}

impl MockAmm {
    fn with_pools(pools: Vec<MockPool>) -> Self {
        MockAmm {
            pools,
            ..Default::default()
        }
    }

    fn failing(mut self, entrypoint: &'static str, pool: u64) -> Self {
        self.fail_on = Some((entrypoint, pool));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    fn pool(&self, address: &Felt) -> Result<&MockPool, RpcError> {
        self.pools
            .iter()
            .find(|p| Felt::from(p.address) == *address)
            .ok_or(RpcError::Contract {
                code: 40,
                message: format!("no pool {address}"),
            })
    }
}

fn revert(message: &str) -> RpcError {
    RpcError::Contract {
        code: 40,
        message: message.into(),
    }
}

#[async_trait]
impl RemoteQueryClient for MockAmm {
    async fn call(&self, entrypoint: &str, args: &[Felt]) -> Result<Vec<Felt>, RpcError> {
        self.log
            .lock()
            .unwrap()
            .push((entrypoint.to_string(), args.to_vec()));

        // Uneven latency so completion order differs from submission order.
        let jitter = args.first().and_then(Felt::to_u64).unwrap_or(0) % 7;
        tokio::time::sleep(Duration::from_millis(jitter * 3)).await;

        if let Some((ep, pool)) = self.fail_on {
            if ep == entrypoint && args.first() == Some(&Felt::from(pool)) {
                return Err(revert("injected failure"));
            }
        }

        match entrypoint {
            "get_all_lptoken_addresses" => {
                let mut out = vec![Felt::from(self.pools.len() as u64)];
                out.extend(self.pools.iter().map(|p| Felt::from(p.address)));
                Ok(out)
            }
            "get_all_options" => {
                let pool = self.pool(&args[0])?;
                let mut out = vec![Felt::from((pool.options.len() * 6) as u64)];
                for o in &pool.options {
                    out.extend([
                        Felt::from(o.side),
                        Felt::from(o.maturity),
                        Felt::from(o.strike),
                        Felt::from(0xc0ffeeu64),
                        Felt::from(0xbeefu64),
                        Felt::from(o.option_type),
                    ]);
                }
                Ok(out)
            }
            "get_pool_locked_capital" => Ok(vec![Felt::from(self.pool(&args[0])?.locked)]),
            "get_unlocked_capital" => Ok(vec![Felt::from(self.pool(&args[0])?.unlocked)]),
            "get_lpool_balance" => Ok(vec![Felt::from(self.pool(&args[0])?.balance)]),
            "get_value_of_pool_position" => {
                Ok(vec![Felt::from(self.pool(&args[0])?.value_position)])
            }
            "get_option_position" => {
                let pool = self.pool(&args[0])?;
                pool.options
                    .iter()
                    .find(|o| {
                        Felt::from(o.side) == args[1]
                            && Felt::from(o.maturity) == args[2]
                            && Felt::from(o.strike) == args[3]
                    })
                    .map(|o| vec![o.position])
                    .ok_or_else(|| revert("no such option"))
            }
            "get_pool_volatility_auto" => {
                let pool = self.pool(&args[0])?;
                pool.volatility
                    .iter()
                    .find(|((maturity, strike), _)| {
                        Felt::from(*maturity) == args[1] && Felt::from(*strike) == args[2]
                    })
                    .map(|(_, v)| vec![Felt::from(*v)])
                    .ok_or_else(|| revert("no volatility"))
            }
            other => Err(revert(&format!("entry point {other} not found"))),
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn option(side: u64, maturity: u64, strike: u128, option_type: u64, position: Felt) -> MockOption {
    MockOption {
        side,
        maturity,
        strike,
        option_type,
        position,
    }
}

/// The worked example: one base-denominated pool with a single option.
fn example_pool() -> MockPool {
    MockPool {
        address: 0x111,
        locked: 2 * E18,
        unlocked: 5 * E18,
        balance: 7 * E18,
        value_position: 3 * TWO_POW_61,
        options: vec![option(0, 1_700_000_000, TWO_POW_61, 0, Felt::from(3 * E18))],
        volatility: HashMap::from([((1_700_000_000, TWO_POW_61), TWO_POW_60)]),
    }
}

/// A put pool holding long and short sides of the same maturity/strike,
/// plus one option at a different strike.
fn paired_put_pool() -> MockPool {
    let strike = 1500 * TWO_POW_61;
    let other_strike = 1600 * TWO_POW_61;
    MockPool {
        address: 0x222,
        locked: 1_000_000,
        unlocked: 4_000_000,
        balance: 5_000_000,
        value_position: TWO_POW_61 / 4,
        options: vec![
            option(0, 100, strike, 1, Felt::from(E18)),
            option(1, 100, strike, 1, Felt::negative(2 * E18)),
            option(0, 100, other_strike, 1, Felt::from(E18 / 2)),
        ],
        volatility: HashMap::from([
            ((100, strike), 3 * TWO_POW_60),
            ((100, other_strike), TWO_POW_61),
        ]),
    }
}

fn third_pool() -> MockPool {
    MockPool {
        address: 0x333,
        locked: 0,
        unlocked: E18,
        balance: E18,
        value_position: 0,
        options: vec![option(1, 200, 2 * TWO_POW_61, 0, Felt::ZERO)],
        volatility: HashMap::from([((200, 2 * TWO_POW_61), TWO_POW_61)]),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn worked_example_is_normalized() {
    let amm = MockAmm::with_pools(vec![example_pool()]);
    let state = SnapshotAggregator::new(&amm).snapshot().await.unwrap();

    assert_eq!(state.pools.len(), 1);
    let pool = &state.pools[0];
    assert_eq!(pool.address, Felt::from(0x111u64));
    assert_eq!(pool.option_type, OptionType::Call);
    assert_eq!(pool.unlocked_capital, 5.0);
    assert_eq!(pool.locked_capital, 2.0);
    assert_eq!(pool.lpool_bal, 7.0);
    assert_eq!(pool.value_pool_position, 3.0);

    let opt = &pool.options[0];
    assert_eq!(opt.option_side, OptionSide::Long);
    assert_eq!(opt.maturity, 1_700_000_000);
    assert_eq!(opt.strike_price, 1.0);
    assert_eq!(opt.pool_position, 3.0);
    assert_eq!(opt.volatility, 0.5);
    assert_eq!(opt.quote_token_address, Felt::from(0xc0ffeeu64));
    assert_eq!(opt.base_token_address, Felt::from(0xbeefu64));
    assert!(state.time > 0);
}

#[tokio::test]
async fn every_discovered_pool_appears_exactly_once() {
    let amm = MockAmm::with_pools(vec![example_pool(), paired_put_pool(), third_pool()]);
    let state = SnapshotAggregator::new(&amm).snapshot().await.unwrap();

    let addresses: Vec<_> = state.pools.iter().map(|p| p.address).collect();
    assert_eq!(
        addresses,
        vec![
            Felt::from(0x111u64),
            Felt::from(0x222u64),
            Felt::from(0x333u64)
        ]
    );
    let put = state.pool(&Felt::from(0x222u64)).unwrap();
    assert_eq!(put.option_type, OptionType::Put);
    assert_eq!(
        (put.unlocked_capital, put.locked_capital, put.lpool_bal),
        (4.0, 1.0, 5.0)
    );
    assert_eq!(put.value_pool_position, 0.25);
    assert_eq!(put.options.len(), 3);
}

#[tokio::test]
async fn position_matches_full_key_but_volatility_ignores_side() {
    let amm = MockAmm::with_pools(vec![paired_put_pool()]);
    let state = SnapshotAggregator::new(&amm).snapshot().await.unwrap();
    let opts = &state.pools[0].options;

    // Same maturity and strike, different side: positions differ...
    assert_eq!(opts[0].option_side, OptionSide::Long);
    assert_eq!(opts[1].option_side, OptionSide::Short);
    assert_eq!(opts[0].pool_position, 1.0);
    assert_eq!(opts[1].pool_position, -2.0);

    // ...but they share the side-less volatility.
    assert_eq!(opts[0].volatility, 1.5);
    assert_eq!(opts[1].volatility, 1.5);

    // A different strike keeps its own figures.
    assert_eq!(opts[2].strike_price, 1600.0);
    assert_eq!(opts[2].pool_position, 0.5);
    assert_eq!(opts[2].volatility, 1.0);
}

#[tokio::test]
async fn stages_run_behind_barriers() {
    let amm = MockAmm::with_pools(vec![example_pool(), paired_put_pool(), third_pool()]);
    SnapshotAggregator::new(&amm).snapshot().await.unwrap();

    let stage_of = |entrypoint: &str| match entrypoint {
        "get_all_lptoken_addresses" => 1,
        "get_all_options" => 2,
        "get_pool_locked_capital" | "get_unlocked_capital" | "get_lpool_balance" => 3,
        "get_value_of_pool_position" => 4,
        "get_option_position" | "get_pool_volatility_auto" => 5,
        other => panic!("unexpected call {other}"),
    };
    let stages: Vec<u32> = amm.calls().iter().map(|e| stage_of(e)).collect();
    assert!(stages.windows(2).all(|w| w[0] <= w[1]), "{stages:?}");

    // 1 discovery + 3 option lists + 9 capital + 3 position values + 2 per option
    assert_eq!(stages.len(), 1 + 3 + 9 + 3 + 2 * 5);
}

#[tokio::test]
async fn stage_five_queries_echo_the_option_key() {
    let amm = MockAmm::with_pools(vec![paired_put_pool()]);
    SnapshotAggregator::new(&amm).snapshot().await.unwrap();

    let log = amm.log.lock().unwrap();
    let strike = Felt::from(1500 * TWO_POW_61);
    let pool = Felt::from(0x222u64);
    assert!(log.iter().any(|(e, args)| {
        e == Entrypoint::GetOptionPosition.name()
            && args == &vec![pool, Felt::from(1u64), Felt::from(100u64), strike]
    }));
    assert!(log.iter().any(|(e, args)| {
        e == Entrypoint::GetPoolVolatilityAuto.name()
            && args == &vec![pool, Felt::from(100u64), strike]
    }));
}

#[tokio::test]
async fn capital_failure_aborts_the_whole_run() {
    let amm = MockAmm::with_pools(vec![example_pool(), paired_put_pool()])
        .failing("get_lpool_balance", 0x222);
    let err = SnapshotAggregator::new(&amm).snapshot().await.unwrap_err();

    match err {
        SnapshotError::Transport {
            entrypoint, args, ..
        } => {
            assert_eq!(entrypoint, Entrypoint::GetLpoolBalance);
            assert_eq!(args, vec![Felt::from(0x222u64)]);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Nothing from later stages was issued.
    assert!(!amm.calls().iter().any(|e| e == "get_value_of_pool_position"));
}

#[tokio::test]
async fn volatility_failure_aborts_the_whole_run() {
    let amm = MockAmm::with_pools(vec![example_pool(), third_pool()])
        .failing("get_pool_volatility_auto", 0x333);
    let err = SnapshotAggregator::new(&amm).snapshot().await.unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::Transport {
            entrypoint: Entrypoint::GetPoolVolatilityAuto,
            ..
        }
    ));
}

#[tokio::test]
async fn position_failure_aborts_the_whole_run() {
    let amm = MockAmm::with_pools(vec![example_pool()]).failing("get_option_position", 0x111);
    assert!(SnapshotAggregator::new(&amm).snapshot().await.is_err());
}

#[tokio::test]
async fn pool_without_options_is_fatal() {
    let mut empty = third_pool();
    empty.options.clear();
    let amm = MockAmm::with_pools(vec![example_pool(), empty]);
    let err = SnapshotAggregator::new(&amm).snapshot().await.unwrap_err();
    assert!(matches!(err, SnapshotError::EmptyPool { pool } if pool == Felt::from(0x333u64)));
}

#[tokio::test]
async fn duplicate_option_keys_are_rejected() {
    let mut pool = example_pool();
    pool.options
        .push(option(0, 1_700_000_000, TWO_POW_61, 0, Felt::from(E18)));
    let amm = MockAmm::with_pools(vec![pool]);
    let err = SnapshotAggregator::new(&amm).snapshot().await.unwrap_err();
    assert!(matches!(err, SnapshotError::DuplicateOption { .. }));
}

#[tokio::test]
async fn no_pools_gives_an_empty_snapshot() {
    let amm = MockAmm::default();
    let state = SnapshotAggregator::new(&amm).snapshot().await.unwrap();
    assert!(state.pools.is_empty());
    assert_eq!(amm.calls(), vec!["get_all_lptoken_addresses".to_string()]);
}

#[tokio::test]
async fn in_flight_cap_gives_the_same_state() {
    let pools = || vec![example_pool(), paired_put_pool(), third_pool()];
    let unlimited = MockAmm::with_pools(pools());
    let capped = MockAmm::with_pools(pools());

    let a = SnapshotAggregator::new(&unlimited).collect().await.unwrap();
    let b = SnapshotAggregator::new(&capped)
        .with_max_in_flight(Some(2))
        .collect()
        .await
        .unwrap();

    let table = amm_snapshot::normalize::ScaleTable::default();
    assert_eq!(
        amm_snapshot::normalize::normalize(&a, &table, 1).unwrap(),
        amm_snapshot::normalize::normalize(&b, &table, 1).unwrap()
    );
}

#[tokio::test]
async fn snapshot_written_to_file_parses_back() {
    let amm = MockAmm::with_pools(vec![example_pool(), paired_put_pool()]);
    let state = SnapshotAggregator::new(&amm).snapshot().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("amm_state.json");
    output::emit(&state, Format::Json, &Sink::File(path.clone())).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let back: amm_snapshot::model::AmmState = serde_json::from_str(&text).unwrap();
    assert_eq!(back, state);
}
