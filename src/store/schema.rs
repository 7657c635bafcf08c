// store/schema.rs — Fixed Arrow schemas for the two tables, plus the
// row <-> RecordBatch conversions.
//
// The schema is static per table; the only configurable part is the vector
// width, fixed at engine construction and identical across all rows.

use std::sync::Arc;

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{Array, ArrayRef, Float32Array, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::error::MemoryError;
use crate::types::{EpisodicRecord, EventKind, SopHit};

pub(crate) const COL_TIMESTAMP: &str = "timestamp";
pub(crate) const COL_VECTOR: &str = "vector";
pub(crate) const COL_REGIME: &str = "regime";
pub(crate) const COL_NARRATIVE: &str = "narrative";
pub(crate) const COL_VENUE: &str = "venue";
pub(crate) const COL_OUTCOME: &str = "outcome";
pub(crate) const COL_KIND: &str = "kind";
pub(crate) const COL_PAYLOAD: &str = "payload";
pub(crate) const COL_REASONING: &str = "reasoning";

/// Distance column appended by the store to vector-search results.
pub(crate) const COL_DISTANCE: &str = "_distance";

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// One fully-resolved procedural row, defaults already applied.
#[derive(Debug, Clone)]
pub(crate) struct ProceduralRow {
    /// Epoch seconds.
    pub timestamp: i64,
    pub vector: Vec<f32>,
    pub regime: String,
    pub narrative: String,
    pub venue: String,
    pub outcome: String,
}

/// One fully-resolved episodic row, defaults already applied.
#[derive(Debug, Clone)]
pub(crate) struct EpisodicRow {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub vector: Vec<f32>,
    pub kind: EventKind,
    pub payload: String,
    pub outcome: String,
    pub venue: String,
    pub reasoning: String,
}

// ─── Schemas ──────────────────────────────────────────────────────────────────

fn vector_field(dims: i32) -> Field {
    let item = Field::new("item", DataType::Float32, true);
    Field::new(
        COL_VECTOR,
        DataType::FixedSizeList(Arc::new(item), dims),
        false,
    )
}

pub(crate) fn procedural_schema(dims: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_TIMESTAMP, DataType::Int64, false),
        vector_field(dims),
        Field::new(COL_REGIME, DataType::Utf8, false),
        Field::new(COL_NARRATIVE, DataType::Utf8, false),
        Field::new(COL_VENUE, DataType::Utf8, false),
        Field::new(COL_OUTCOME, DataType::Utf8, false),
    ]))
}

pub(crate) fn episodic_schema(dims: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_TIMESTAMP, DataType::Int64, false),
        vector_field(dims),
        Field::new(COL_KIND, DataType::Utf8, false),
        Field::new(COL_PAYLOAD, DataType::Utf8, false),
        Field::new(COL_OUTCOME, DataType::Utf8, false),
        Field::new(COL_VENUE, DataType::Utf8, false),
        Field::new(COL_REASONING, DataType::Utf8, false),
    ]))
}

/// Vector width declared by a table's schema, if it carries one.
pub(crate) fn vector_width(schema: &Schema) -> Option<usize> {
    let field = schema.field_with_name(COL_VECTOR).ok()?;
    match field.data_type() {
        DataType::FixedSizeList(_, dims) => usize::try_from(*dims).ok(),
        _ => None,
    }
}

// ─── Row -> batch ─────────────────────────────────────────────────────────────

fn vector_array(dims: i32, vector: &[f32]) -> ArrayRef {
    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), dims);
    builder.values().append_slice(vector);
    builder.append(true);
    Arc::new(builder.finish())
}

fn utf8(value: &str) -> ArrayRef {
    Arc::new(StringArray::from(vec![Some(value)]))
}

pub(crate) fn procedural_batch(
    schema: &SchemaRef,
    dims: i32,
    row: &ProceduralRow,
) -> Result<RecordBatch, MemoryError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![row.timestamp])),
        vector_array(dims, &row.vector),
        utf8(&row.regime),
        utf8(&row.narrative),
        utf8(&row.venue),
        utf8(&row.outcome),
    ];
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

pub(crate) fn episodic_batch(
    schema: &SchemaRef,
    dims: i32,
    row: &EpisodicRow,
) -> Result<RecordBatch, MemoryError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![row.timestamp])),
        vector_array(dims, &row.vector),
        utf8(row.kind.as_str()),
        utf8(&row.payload),
        utf8(&row.outcome),
        utf8(&row.venue),
        utf8(&row.reasoning),
    ];
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

// ─── Batch -> rows ────────────────────────────────────────────────────────────

fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
}

fn i64_col<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
}

/// Distance column value, tolerating either float width.
fn distance_at(batch: &RecordBatch, i: usize) -> f32 {
    let col = batch.column_by_name(COL_DISTANCE);
    if let Some(a) = col.and_then(|c| c.as_any().downcast_ref::<Float32Array>()) {
        a.value(i)
    } else if let Some(a) = col.and_then(|c| c.as_any().downcast_ref::<Float64Array>()) {
        a.value(i) as f32
    } else {
        f32::MAX
    }
}

/// Parse ranked search results. Batch row order is the store's ranking and is
/// preserved as-is.
pub(crate) fn parse_sop_hits(batch: &RecordBatch) -> Vec<SopHit> {
    let (Some(regime), Some(narrative), Some(venue)) = (
        str_col(batch, COL_REGIME),
        str_col(batch, COL_NARRATIVE),
        str_col(batch, COL_VENUE),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if regime.is_null(i) || narrative.is_null(i) || venue.is_null(i) {
            continue;
        }
        out.push(SopHit {
            regime: regime.value(i).to_string(),
            narrative: narrative.value(i).to_string(),
            venue: venue.value(i).to_string(),
            distance: distance_at(batch, i),
        });
    }
    out
}

pub(crate) fn parse_episodic_records(batch: &RecordBatch) -> Vec<EpisodicRecord> {
    let (Some(timestamp), Some(kind), Some(payload), Some(outcome), Some(venue), Some(reasoning)) = (
        i64_col(batch, COL_TIMESTAMP),
        str_col(batch, COL_KIND),
        str_col(batch, COL_PAYLOAD),
        str_col(batch, COL_OUTCOME),
        str_col(batch, COL_VENUE),
        str_col(batch, COL_REASONING),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if timestamp.is_null(i) || payload.is_null(i) {
            continue;
        }
        out.push(EpisodicRecord {
            timestamp: timestamp.value(i),
            kind: EventKind::parse(kind.value(i)),
            payload: payload.value(i).to_string(),
            outcome: outcome.value(i).to_string(),
            venue: venue.value(i).to_string(),
            reasoning: reasoning.value(i).to_string(),
        });
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_declare_the_configured_width() {
        assert_eq!(vector_width(&procedural_schema(768)), Some(768));
        assert_eq!(vector_width(&episodic_schema(8)), Some(8));
    }

    #[test]
    fn procedural_batch_round_trips_scalars() {
        let schema = procedural_schema(4);
        let row = ProceduralRow {
            timestamp: 1_700_000_000,
            vector: vec![0.1, 0.2, 0.3, 0.4],
            regime: "LAMINAR_BULL".into(),
            narrative: "Buy the dip".into(),
            venue: "KRAKEN".into(),
            outcome: "PROFIT".into(),
        };
        let batch = procedural_batch(&schema, 4, &row).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(str_col(&batch, COL_REGIME).unwrap().value(0), "LAMINAR_BULL");
        assert_eq!(str_col(&batch, COL_VENUE).unwrap().value(0), "KRAKEN");
        assert_eq!(
            i64_col(&batch, COL_TIMESTAMP).unwrap().value(0),
            1_700_000_000
        );
    }

    #[test]
    fn episodic_batch_parses_back() {
        let schema = episodic_schema(2);
        let row = EpisodicRow {
            timestamp: 42,
            vector: vec![1.0, 0.0],
            kind: EventKind::Veto,
            payload: r#"{"trade_id":"T-1"}"#.into(),
            outcome: "N/A".into(),
            venue: "ALL".into(),
            reasoning: "spread too wide".into(),
        };
        let batch = episodic_batch(&schema, 2, &row).unwrap();
        let records = parse_episodic_records(&batch);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, EventKind::Veto);
        assert_eq!(records[0].timestamp, 42);
        assert_eq!(records[0].reasoning, "spread too wide");
    }

    #[test]
    fn missing_distance_column_parses_as_max() {
        let schema = procedural_schema(2);
        let row = ProceduralRow {
            timestamp: 0,
            vector: vec![0.0, 1.0],
            regime: "R".into(),
            narrative: "n".into(),
            venue: "ALL".into(),
            outcome: "unknown".into(),
        };
        let batch = procedural_batch(&schema, 2, &row).unwrap();
        let hits = parse_sop_hits(&batch);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, f32::MAX);
    }
}
