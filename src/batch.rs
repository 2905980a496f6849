use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::error::SnapshotError;
use crate::model::Felt;
use crate::rpc::{Entrypoint, RemoteQueryClient};

/// One call to issue, with a caller-defined tag carried through to its answer.
#[derive(Debug, Clone)]
pub struct Query<T> {
    pub entrypoint: Entrypoint,
    pub args: Vec<Felt>,
    pub tag: T,
}

/// A completed call, still paired with the arguments that produced it.
#[derive(Debug, Clone)]
pub struct Answer<T> {
    pub entrypoint: Entrypoint,
    pub args: Vec<Felt>,
    pub tag: T,
    pub values: Vec<Felt>,
}

impl<T> Answer<T> {
    /// First returned felt, for views that answer with a single value.
    pub fn single(&self) -> Result<Felt, SnapshotError> {
        self.values.first().copied().ok_or_else(|| SnapshotError::Malformed {
            entrypoint: self.entrypoint,
            reason: "empty result".into(),
        })
    }

    /// Argument at `idx`, i.e. the key this answer belongs to.
    pub fn arg(&self, idx: usize) -> Result<Felt, SnapshotError> {
        self.args.get(idx).copied().ok_or_else(|| SnapshotError::Malformed {
            entrypoint: self.entrypoint,
            reason: format!("query has no argument #{idx}"),
        })
    }
}

/// Fan-out/gather over independent calls.
///
/// All queries are started together and the batch resolves only once every
/// one of them has settled. Answers keep their originating arguments and tag,
/// so callers match results by key rather than by position. If any call
/// failed, the whole batch fails with the first failure in submission order.
#[derive(Debug)]
pub struct QueryBatch<T> {
    queries: Vec<Query<T>>,
    max_in_flight: Option<usize>,
}

impl<T> Default for QueryBatch<T> {
    fn default() -> Self {
        QueryBatch {
            queries: Vec::new(),
            max_in_flight: None,
        }
    }
}

impl<T> QueryBatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of calls in flight. `None` (or 0) issues everything at once.
    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight = limit.filter(|&n| n > 0);
        self
    }

    pub fn push(&mut self, entrypoint: Entrypoint, args: Vec<Felt>, tag: T) {
        self.queries.push(Query {
            entrypoint,
            args,
            tag,
        });
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub async fn run<C>(self, client: &C) -> Result<Vec<Answer<T>>, SnapshotError>
    where
        C: RemoteQueryClient + ?Sized,
    {
        let calls = self.queries.into_iter().map(|q| async move {
            let result = client.call(q.entrypoint.name(), &q.args).await;
            (q, result)
        });

        let settled = match self.max_in_flight {
            Some(limit) => stream::iter(calls).buffered(limit).collect::<Vec<_>>().await,
            None => join_all(calls).await,
        };

        settled
            .into_iter()
            .map(|(q, result)| match result {
                Ok(values) => Ok(Answer {
                    entrypoint: q.entrypoint,
                    args: q.args,
                    tag: q.tag,
                    values,
                }),
                Err(source) => Err(SnapshotError::Transport {
                    entrypoint: q.entrypoint,
                    args: q.args,
                    source,
                }),
            })
            .collect()
    }
}
