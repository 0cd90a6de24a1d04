use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::{
    db::{FavoritesLookup, PropertyStore},
    error::{AppError, AppResult},
    models::{CellBounds, CellProperty, CellResult, PropertyClass},
    services::favorites_or_empty,
};

/// Answers a viewport split into cells with one bounding-box query per cell.
pub struct CellQueryEngine {
    properties: Arc<dyn PropertyStore>,
    favorites: Arc<dyn FavoritesLookup>,
    permits: Arc<Semaphore>,
    cell_timeout: Duration,
}

impl CellQueryEngine {
    pub fn new(
        properties: Arc<dyn PropertyStore>,
        favorites: Arc<dyn FavoritesLookup>,
        concurrency: usize,
        cell_timeout: Duration,
    ) -> Self {
        Self {
            properties,
            favorites,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            cell_timeout,
        }
    }

    /// One result per input cell, in input order.
    ///
    /// Every cell is validated before any query runs; a single bad cell
    /// rejects the batch. A cell whose query outlives `cell_timeout` comes
    /// back empty with `timed_out` set. Store errors fail the batch.
    #[tracing::instrument(skip(self, cells), fields(cell_count = cells.len()))]
    pub async fn query_cells(
        &self,
        cells: Vec<CellBounds>,
        class: PropertyClass,
        user_id: Option<i64>,
    ) -> AppResult<Vec<CellResult>> {
        for (index, cell) in cells.iter().enumerate() {
            cell.validate()
                .map_err(|reason| AppError::InvalidCellBounds(format!("cell {}: {}", index, reason)))?;
        }

        if cells.is_empty() {
            return Ok(Vec::new());
        }

        let mut tasks = Vec::with_capacity(cells.len());
        for (index, cell) in cells.into_iter().enumerate() {
            let store = self.properties.clone();
            let permits = self.permits.clone();
            let cell_timeout = self.cell_timeout;

            tasks.push(tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?;

                match tokio::time::timeout(cell_timeout, store.find_in_bounds(&cell, class)).await {
                    Ok(Ok(properties)) => Ok(CellResult {
                        cell,
                        properties: properties.into_iter().map(CellProperty::from).collect(),
                        timed_out: false,
                    }),
                    Ok(Err(e)) => Err(e),
                    Err(_) => {
                        tracing::warn!(
                            index,
                            timeout_ms = cell_timeout.as_millis() as u64,
                            "Cell query timed out, returning it empty"
                        );
                        Ok(CellResult {
                            cell,
                            properties: Vec::new(),
                            timed_out: true,
                        })
                    }
                }
            }));
        }

        // Awaiting in spawn order keeps input order regardless of completion order.
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(AppError::Internal(e.to_string())),
            }
        }

        if let Some(user_id) = user_id {
            let favorites = favorites_or_empty(self.favorites.as_ref(), user_id).await;
            for property in results.iter_mut().flat_map(|r| r.properties.iter_mut()) {
                property.liked = Some(favorites.contains(&property.property.property_id));
            }
        }

        tracing::debug!(
            found = results.iter().map(|r| r.properties.len()).sum::<usize>(),
            timed_out = results.iter().filter(|r| r.timed_out).count(),
            "Cell batch completed"
        );

        Ok(results)
    }
}
