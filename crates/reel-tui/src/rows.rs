//! Catalog rows: one discovery request per configured bucket, all in flight
//! at once, each result delivered on its own.
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use reel_proto::catalog::{CatalogBucket, Item};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::query::{discover_items, CatalogQuery};

#[derive(Debug, Clone, PartialEq)]
pub enum RowState {
    Loading,
    Loaded(Vec<Item>),
    /// User-facing message, e.g. `Could not load Horror.`
    Failed(String),
}

#[derive(Debug)]
pub struct RowUpdate {
    pub generation: u64,
    pub row: usize,
    pub state: RowState,
}

/// Start every bucket's request in declared order.  Updates arrive in
/// completion order; the board puts them in the right row.
pub fn spawn_row_loads(
    client: Arc<dyn CatalogQuery>,
    buckets: Vec<CatalogBucket>,
    limit: usize,
    generation: u64,
    tx: mpsc::Sender<RowUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut pending: FuturesUnordered<_> = buckets
            .into_iter()
            .enumerate()
            .map(|(row, bucket)| {
                let client = client.clone();
                async move {
                    let state = match discover_items(client.as_ref(), &bucket, limit).await {
                        Ok(items) => {
                            debug!("rows: {} loaded {} items", bucket.name, items.len());
                            RowState::Loaded(items)
                        }
                        Err(e) => {
                            warn!("rows: {} (genre {}) failed: {}", bucket.name, bucket.id, e);
                            RowState::Failed(format!("Could not load {}.", bucket.name))
                        }
                    };
                    (row, state)
                }
            })
            .collect();

        while let Some((row, state)) = pending.next().await {
            let update = RowUpdate {
                generation,
                row,
                state,
            };
            if tx.send(update).await.is_err() {
                break;
            }
        }
    })
}

pub struct Row {
    pub bucket: CatalogBucket,
    pub state: RowState,
}

impl Row {
    pub fn items(&self) -> &[Item] {
        match &self.state {
            RowState::Loaded(items) => items,
            _ => &[],
        }
    }
}

/// The rows in declared order, plus which load generation they belong to.
pub struct RowBoard {
    rows: Vec<Row>,
    generation: u64,
}

impl RowBoard {
    pub fn new(buckets: &[CatalogBucket]) -> Self {
        Self {
            rows: buckets
                .iter()
                .map(|b| Row {
                    bucket: b.clone(),
                    state: RowState::Loading,
                })
                .collect(),
            generation: 0,
        }
    }

    /// Put every row back to `Loading` and return the generation new loads
    /// must carry.
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        for row in &mut self.rows {
            row.state = RowState::Loading;
        }
        self.generation
    }

    /// Returns `false` for updates from an earlier load or an unknown row.
    pub fn apply(&mut self, update: RowUpdate) -> bool {
        if update.generation != self.generation {
            debug!("rows: dropping update from load {}", update.generation);
            return false;
        }
        match self.rows.get_mut(update.row) {
            Some(row) => {
                row.state = update.state;
                true
            }
            None => false,
        }
    }

    pub fn buckets(&self) -> Vec<CatalogBucket> {
        self.rows.iter().map(|r| r.bucket.clone()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::tests::FakeCatalog;
    use crate::query::QueryError;
    use serde_json::json;
    use std::time::Duration;

    fn buckets() -> Vec<CatalogBucket> {
        vec![
            CatalogBucket::new("1", "A"),
            CatalogBucket::new("2", "B"),
            CatalogBucket::new("3", "C"),
        ]
    }

    fn page(genre: &str) -> serde_json::Value {
        let results: Vec<_> = (0..30)
            .map(|i| json!({ "id": i, "title": format!("{}-{}", genre, i) }))
            .collect();
        json!({ "results": results })
    }

    async fn load(fake: FakeCatalog, limit: usize) -> (RowBoard, Vec<usize>, Arc<FakeCatalog>) {
        let fake = Arc::new(fake);
        let mut board = RowBoard::new(&buckets());
        let generation = board.reset();
        let (tx, mut rx) = mpsc::channel(8);
        spawn_row_loads(fake.clone(), board.buckets(), limit, generation, tx);

        let mut order = Vec::new();
        while let Some(update) = rx.recv().await {
            order.push(update.row);
            assert!(board.apply(update));
        }
        (board, order, fake)
    }

    #[tokio::test]
    async fn test_one_failing_row_leaves_others_intact() {
        let fake = FakeCatalog::new(|q| match q.genre_id.as_deref() {
            Some("2") => Err(QueryError::Status {
                status: 500,
                body: String::new(),
            }),
            Some(g) => Ok(page(g)),
            None => unreachable!(),
        });
        let (board, _, fake) = load(fake, 20).await;

        let rows = board.rows();
        assert_eq!(rows[0].items().len(), 20);
        assert_eq!(rows[0].items()[0].title.as_deref(), Some("1-0"));
        assert_eq!(rows[1].state, RowState::Failed("Could not load B.".into()));
        assert_eq!(rows[2].items().len(), 20);
        assert_eq!(fake.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_stay_in_declared_order_whatever_finishes_first() {
        let fake = FakeCatalog::new(|q| Ok(page(q.genre_id.as_deref().unwrap_or_default())))
            .with_delay(|q| match q.genre_id.as_deref() {
                Some("1") => Duration::from_millis(300),
                Some("2") => Duration::from_millis(200),
                _ => Duration::from_millis(100),
            });
        let (board, order, fake) = load(fake, 5).await;

        assert_eq!(order, vec![2, 1, 0]);
        let names: Vec<_> = board.rows().iter().map(|r| r.bucket.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(board.rows()[2].items()[0].title.as_deref(), Some("3-0"));

        let mut requested: Vec<_> = fake.calls().into_iter().filter_map(|q| q.genre_id).collect();
        requested.sort();
        assert_eq!(requested, ["1", "2", "3"]);
    }

    #[test]
    fn test_updates_from_previous_load_are_dropped() {
        let mut board = RowBoard::new(&buckets());
        let first = board.reset();
        let second = board.reset();
        assert!(!board.apply(RowUpdate {
            generation: first,
            row: 0,
            state: RowState::Loaded(vec![]),
        }));
        assert_eq!(board.rows()[0].state, RowState::Loading);
        assert!(board.apply(RowUpdate {
            generation: second,
            row: 0,
            state: RowState::Loaded(vec![]),
        }));
        assert!(!board.apply(RowUpdate {
            generation: second,
            row: 9,
            state: RowState::Loading,
        }));
    }
}
