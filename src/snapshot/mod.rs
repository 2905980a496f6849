mod accumulator;

use std::time::Instant;

use tracing::{debug, info};

use crate::batch::{Answer, QueryBatch};
use crate::error::SnapshotError;
use crate::model::{AmmState, Felt, OptionKey, OptionSide, RawOption, VolatilityKey};
use crate::model::option::OPTION_RECORD_LEN;
use crate::normalize::{ScaleTable, normalize};
use crate::rpc::{Entrypoint, RemoteQueryClient};

pub use accumulator::{Accumulator, RawPool};

/// Which pool figure a capital-accounting answer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapitalField {
    Locked,
    Unlocked,
    Balance,
}

/// Which per-option family a stage-5 answer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionFigure {
    Position,
    Volatility,
}

/// Builds one consistent snapshot of the AMM through five barrier-separated
/// stages:
///
/// 1. pool discovery (`get_all_lptoken_addresses`)
/// 2. option discovery per pool (`get_all_options`)
/// 3. capital accounting per pool (locked, unlocked, balance)
/// 4. value of the pool position per pool
/// 5. position and volatility per option
///
/// Each stage is a single [`QueryBatch`] over the keys found by the stage
/// before it. Answers are merged into the [`Accumulator`] only after their
/// batch has fully resolved.
pub struct SnapshotAggregator<'a, C: ?Sized> {
    client: &'a C,
    max_in_flight: Option<usize>,
    scales: ScaleTable,
}

impl<'a, C> SnapshotAggregator<'a, C>
where
    C: RemoteQueryClient + ?Sized,
{
    pub fn new(client: &'a C) -> Self {
        SnapshotAggregator {
            client,
            max_in_flight: None,
            scales: ScaleTable::default(),
        }
    }

    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight = limit;
        self
    }

    pub fn with_scales(mut self, scales: ScaleTable) -> Self {
        self.scales = scales;
        self
    }

    /// Run every stage, then normalize. The capture time is taken once all
    /// queries have completed.
    pub async fn snapshot(&self) -> Result<AmmState, SnapshotError> {
        let acc = self.collect().await?;
        let time = chrono::Utc::now().timestamp();
        normalize(&acc, &self.scales, time)
    }

    /// Run stages 1 through 5 and return the raw accumulator.
    pub async fn collect(&self) -> Result<Accumulator, SnapshotError> {
        let started = Instant::now();

        let mut acc = self.discover_pools().await?;
        self.discover_options(&mut acc).await?;
        self.fetch_capital(&mut acc).await?;
        self.fetch_pool_positions(&mut acc).await?;
        self.fetch_option_figures(&mut acc).await?;

        info!(
            pools = acc.len(),
            options = acc.option_count(),
            "AMM state collected in {:.2?}",
            started.elapsed()
        );
        Ok(acc)
    }

    fn batch<T>(&self) -> QueryBatch<T> {
        QueryBatch::new().with_max_in_flight(self.max_in_flight)
    }

    // ── Stage 1 ──────────────────────────────────────────────────────

    async fn discover_pools(&self) -> Result<Accumulator, SnapshotError> {
        let mut batch = self.batch();
        batch.push(Entrypoint::GetAllLptokenAddresses, vec![], ());
        let answer = single_answer(batch.run(self.client).await?)?;

        let addresses = strip_length(&answer)?;
        let acc = Accumulator::with_pools(addresses.iter().copied())?;
        info!(pools = acc.len(), "discovered pools");
        Ok(acc)
    }

    // ── Stage 2 ──────────────────────────────────────────────────────

    async fn discover_options(&self, acc: &mut Accumulator) -> Result<(), SnapshotError> {
        let started = Instant::now();
        let mut batch = self.batch();
        for pool in acc.addresses() {
            batch.push(Entrypoint::GetAllOptions, vec![pool], ());
        }

        for answer in batch.run(self.client).await? {
            let pool_address = answer.arg(0)?;
            let records = strip_length(&answer)?;
            if records.len() % OPTION_RECORD_LEN != 0 {
                return Err(SnapshotError::Malformed {
                    entrypoint: answer.entrypoint,
                    reason: format!(
                        "{} felts do not split into {OPTION_RECORD_LEN}-field option records",
                        records.len()
                    ),
                });
            }

            let pool = pool_mut(acc, answer.entrypoint, &pool_address)?;
            for record in records.chunks_exact(OPTION_RECORD_LEN) {
                let option = RawOption::from_record(record).map_err(|reason| {
                    SnapshotError::Malformed {
                        entrypoint: answer.entrypoint,
                        reason,
                    }
                })?;
                pool.insert_option(option)?;
            }
            debug!(pool = %pool_address, options = pool.options().len(), "options discovered");
        }

        info!(
            options = acc.option_count(),
            "discovered options in {:.2?}",
            started.elapsed()
        );
        Ok(())
    }

    // ── Stage 3 ──────────────────────────────────────────────────────

    async fn fetch_capital(&self, acc: &mut Accumulator) -> Result<(), SnapshotError> {
        let started = Instant::now();
        let mut batch = self.batch();
        for pool in acc.addresses() {
            batch.push(Entrypoint::GetPoolLockedCapital, vec![pool], CapitalField::Locked);
            batch.push(Entrypoint::GetUnlockedCapital, vec![pool], CapitalField::Unlocked);
            batch.push(Entrypoint::GetLpoolBalance, vec![pool], CapitalField::Balance);
        }
        let fanout = batch.len();

        for answer in batch.run(self.client).await? {
            let value = answer.single()?;
            let pool = pool_mut(acc, answer.entrypoint, &answer.arg(0)?)?;
            let slot = match answer.tag {
                CapitalField::Locked => &mut pool.locked_capital,
                CapitalField::Unlocked => &mut pool.unlocked_capital,
                CapitalField::Balance => &mut pool.lpool_bal,
            };
            *slot = Some(value);
        }

        info!(calls = fanout, "fetched pool capital in {:.2?}", started.elapsed());
        Ok(())
    }

    // ── Stage 4 ──────────────────────────────────────────────────────

    async fn fetch_pool_positions(&self, acc: &mut Accumulator) -> Result<(), SnapshotError> {
        let started = Instant::now();
        let mut batch = self.batch();
        for pool in acc.addresses() {
            batch.push(Entrypoint::GetValueOfPoolPosition, vec![pool], ());
        }

        for answer in batch.run(self.client).await? {
            let value = answer.single()?;
            pool_mut(acc, answer.entrypoint, &answer.arg(0)?)?.value_pool_position = Some(value);
        }

        info!("fetched pool position values in {:.2?}", started.elapsed());
        Ok(())
    }

    // ── Stage 5 ──────────────────────────────────────────────────────

    /// Pool by pool, fan out one position and one volatility query per
    /// option and match each answer back by the key echoed in its arguments.
    async fn fetch_option_figures(&self, acc: &mut Accumulator) -> Result<(), SnapshotError> {
        let started = Instant::now();
        let addresses: Vec<_> = acc.addresses().collect();

        for address in addresses {
            let mut batch = self.batch();
            let options = acc.pool(&address).map(RawPool::options).unwrap_or_default();
            for option in options {
                batch.push(
                    Entrypoint::GetOptionPosition,
                    vec![
                        address,
                        option.option_side.to_felt(),
                        option.maturity.into(),
                        option.strike_price,
                    ],
                    OptionFigure::Position,
                );
                batch.push(
                    Entrypoint::GetPoolVolatilityAuto,
                    vec![address, option.maturity.into(), option.strike_price],
                    OptionFigure::Volatility,
                );
            }
            if batch.is_empty() {
                continue;
            }

            let answers = batch.run(self.client).await?;
            let pool = pool_mut(acc, Entrypoint::GetOptionPosition, &address)?;
            for answer in answers {
                let value = answer.single()?;
                match answer.tag {
                    OptionFigure::Position => pool.set_position(&position_key(&answer)?, value)?,
                    OptionFigure::Volatility => {
                        pool.set_volatility(&volatility_key(&answer)?, value)?
                    }
                }
            }
            debug!(pool = %address, "fetched option positions and volatilities");
        }

        info!(
            options = acc.option_count(),
            "fetched option figures in {:.2?}",
            started.elapsed()
        );
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn single_answer<T>(mut answers: Vec<Answer<T>>) -> Result<Answer<T>, SnapshotError> {
    match answers.pop() {
        Some(answer) if answers.is_empty() => Ok(answer),
        _ => Err(SnapshotError::Malformed {
            entrypoint: Entrypoint::GetAllLptokenAddresses,
            reason: "expected exactly one answer".into(),
        }),
    }
}

/// Array results lead with their length; drop it.
fn strip_length<T>(answer: &Answer<T>) -> Result<&[Felt], SnapshotError> {
    match answer.values.split_first() {
        Some((_, rest)) => Ok(rest),
        None => Err(SnapshotError::Malformed {
            entrypoint: answer.entrypoint,
            reason: "empty array result".into(),
        }),
    }
}

fn pool_mut<'a>(
    acc: &'a mut Accumulator,
    entrypoint: Entrypoint,
    address: &Felt,
) -> Result<&'a mut RawPool, SnapshotError> {
    acc.pool_mut(address).ok_or(SnapshotError::UnknownPool {
        entrypoint,
        pool: *address,
    })
}

/// Rebuild the full key from `get_option_position(pool, side, maturity, strike)`.
fn position_key<T>(answer: &Answer<T>) -> Result<OptionKey, SnapshotError> {
    let side = answer.arg(1)?;
    Ok(OptionKey {
        side: OptionSide::from_felt(&side).ok_or_else(|| SnapshotError::Malformed {
            entrypoint: answer.entrypoint,
            reason: format!("unknown option side {side}"),
        })?,
        maturity: maturity_arg(answer, 2)?,
        strike: answer.arg(3)?,
    })
}

/// Rebuild the side-less key from `get_pool_volatility_auto(pool, maturity, strike)`.
fn volatility_key<T>(answer: &Answer<T>) -> Result<VolatilityKey, SnapshotError> {
    Ok(VolatilityKey {
        maturity: maturity_arg(answer, 1)?,
        strike: answer.arg(2)?,
    })
}

fn maturity_arg<T>(answer: &Answer<T>, idx: usize) -> Result<u64, SnapshotError> {
    let raw = answer.arg(idx)?;
    raw.to_u64().ok_or_else(|| SnapshotError::Malformed {
        entrypoint: answer.entrypoint,
        reason: format!("maturity {raw} is not a timestamp"),
    })
}
