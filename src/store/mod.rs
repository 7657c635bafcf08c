// store/mod.rs — The vector-store collaborator, wrapped.
//
// Owns the LanceDB connection lifecycle and the two tables. Table creation is
// idempotent (open if present, create from the fixed schema otherwise) and an
// existing table whose vector width disagrees with the configured
// dimensionality is a lifecycle failure, not something to paper over.

pub(crate) mod schema;

use std::path::Path;

use futures_util::TryStreamExt;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use tracing::debug;

use crate::config::MemoryConfig;
use crate::error::MemoryError;
use crate::types::{EpisodicRecord, SopHit};
use schema::{EpisodicRow, ProceduralRow};

const SOP_SEARCH_COLUMNS: &[&str] = &[
    schema::COL_REGIME,
    schema::COL_NARRATIVE,
    schema::COL_VENUE,
    schema::COL_DISTANCE,
];

const EPISODIC_SCAN_COLUMNS: &[&str] = &[
    schema::COL_TIMESTAMP,
    schema::COL_KIND,
    schema::COL_PAYLOAD,
    schema::COL_OUTCOME,
    schema::COL_VENUE,
    schema::COL_REASONING,
];

pub(crate) struct MemoryStore {
    procedural: Table,
    episodic: Table,
    procedural_schema: arrow_schema::SchemaRef,
    episodic_schema: arrow_schema::SchemaRef,
    dims: i32,
}

impl MemoryStore {
    /// Create the storage root if absent and open-or-create both tables.
    pub(crate) async fn open(root: &Path, config: &MemoryConfig) -> Result<Self, MemoryError> {
        let dims = config.embedding.dimensions;
        let dims = i32::try_from(dims)
            .ok()
            .filter(|d| *d > 0)
            .ok_or(MemoryError::InvalidDimension(dims))?;

        std::fs::create_dir_all(root)
            .map_err(|e| MemoryError::StoragePath(root.to_path_buf(), e))?;

        let conn = lancedb::connect(&root.to_string_lossy())
            .execute()
            .await?;

        let procedural_schema = schema::procedural_schema(dims);
        let episodic_schema = schema::episodic_schema(dims);
        let procedural = open_or_create(
            &conn,
            &config.procedural_table,
            procedural_schema.clone(),
            dims,
        )
        .await?;
        let episodic =
            open_or_create(&conn, &config.episodic_table, episodic_schema.clone(), dims).await?;

        Ok(Self {
            procedural,
            episodic,
            procedural_schema,
            episodic_schema,
            dims,
        })
    }

    pub(crate) fn dims(&self) -> usize {
        self.dims as usize
    }

    pub(crate) async fn append_sop(&self, row: &ProceduralRow) -> Result<(), MemoryError> {
        let batch = schema::procedural_batch(&self.procedural_schema, self.dims, row)?;
        append(&self.procedural, batch).await
    }

    pub(crate) async fn append_event(&self, row: &EpisodicRow) -> Result<(), MemoryError> {
        let batch = schema::episodic_batch(&self.episodic_schema, self.dims, row)?;
        append(&self.episodic, batch).await
    }

    /// Ranked ANN search over the procedural table. Results come back in the
    /// store's ascending-distance order, preserved for the venue cascade.
    pub(crate) async fn search_sops(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SopHit>, MemoryError> {
        let mut stream = self
            .procedural
            .query()
            .nearest_to(vector)?
            .column(schema::COL_VECTOR)
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .select(Select::columns(SOP_SEARCH_COLUMNS))
            .execute()
            .await?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            hits.extend(schema::parse_sop_hits(&batch));
        }
        Ok(hits)
    }

    /// Exhaustive scan of the episodic table, optionally restricted to an
    /// inclusive timestamp window pushed down to the store.
    pub(crate) async fn scan_events(
        &self,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<EpisodicRecord>, MemoryError> {
        let mut query = self
            .episodic
            .query()
            .select(Select::columns(EPISODIC_SCAN_COLUMNS));
        if let Some((start, end)) = window {
            query = query.only_if(format!(
                "{col} >= {start} AND {col} <= {end}",
                col = schema::COL_TIMESTAMP
            ));
        }

        let mut stream = query.execute().await?;
        let mut records = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            records.extend(schema::parse_episodic_records(&batch));
        }
        Ok(records)
    }

    pub(crate) async fn sop_count(&self) -> Result<usize, MemoryError> {
        Ok(self.procedural.count_rows(None).await?)
    }

    pub(crate) async fn event_count(&self) -> Result<usize, MemoryError> {
        Ok(self.episodic.count_rows(None).await?)
    }
}

async fn open_or_create(
    conn: &Connection,
    name: &str,
    table_schema: arrow_schema::SchemaRef,
    dims: i32,
) -> Result<Table, MemoryError> {
    let table = match conn.open_table(name).execute().await {
        Ok(table) => table,
        Err(_) => {
            conn.create_empty_table(name, table_schema)
                .execute()
                .await?
        }
    };

    let found = schema::vector_width(&*table.schema().await?);
    let expected = dims as usize;
    if found != Some(expected) {
        return Err(MemoryError::DimensionMismatch {
            table: name.to_string(),
            expected,
            found: found.unwrap_or(0),
        });
    }

    // Best effort: ANN indexing needs enough rows to train, so a fresh or
    // small table legitimately refuses. Searches fall back to exact scan.
    if let Err(e) = table
        .create_index(&[schema::COL_VECTOR], Index::Auto)
        .execute()
        .await
    {
        debug!(table = name, err = %e, "vector index creation skipped");
    }

    Ok(table)
}

async fn append(table: &Table, batch: arrow_array::RecordBatch) -> Result<(), MemoryError> {
    let batch_schema = batch.schema();
    let reader: Box<dyn arrow_array::RecordBatchReader + Send> = Box::new(
        arrow_array::RecordBatchIterator::new([Ok(batch)].into_iter(), batch_schema),
    );
    table.add(reader).execute().await?;
    Ok(())
}
