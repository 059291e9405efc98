//! Puits PostgreSQL/PostGIS
//!
//! Toutes les étapes d'un plan partagent une transaction. Les lignes sont
//! transmises par `COPY ... FROM STDIN (FORMAT csv)`, la géométrie en EWKB
//! hexadécimal.

use bytes::BytesMut;
use citygeo::Value;
use deadpool_postgres::Pool;
use futures::SinkExt;
use tracing::{debug, info};

use super::plan::{TableSpec, WritePlan, WriteStep};
use super::transaction::LoadTransaction;
use super::Sink;
use crate::error::SinkError;

/// Lignes envoyées par message COPY
const COPY_CHUNK_ROWS: usize = 1000;

/// Puits PostgreSQL
pub struct PostgresSink {
    pool: Pool,
}

impl PostgresSink {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl Sink for PostgresSink {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn execute(&mut self, plan: &WritePlan<'_>) -> Result<u64, SinkError> {
        let mut client = self.pool.get().await?;
        let label = plan.tables().join(",");
        let mut tx = LoadTransaction::begin(&mut client, &label).await?;

        match run_steps(&mut tx, plan).await {
            Ok(()) => Ok(tx.commit().await?.rows_written),
            Err(e) => {
                tx.rollback(&e.to_string()).await;
                Err(e)
            }
        }
    }
}

async fn run_steps(tx: &mut LoadTransaction<'_>, plan: &WritePlan<'_>) -> Result<(), SinkError> {
    for step in &plan.steps {
        match step {
            WriteStep::Ensure(spec) => {
                let sql = create_table_sql(spec);
                debug!(sql = %sql, "Ensuring table");
                tx.transaction().batch_execute(&sql).await?;
            }
            WriteStep::Truncate(table) => {
                info!(table = %table, "Truncating table");
                tx.transaction()
                    .batch_execute(&format!("TRUNCATE TABLE {}", table))
                    .await?;
            }
            WriteStep::Insert(table) => {
                let rows = copy_rows(tx, table, plan).await?;
                tx.record_rows(rows);
                info!(table = %table, rows, total = tx.rows_written(), "Rows copied");
            }
        }
    }
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` pour une table cible
pub fn create_table_sql(spec: &TableSpec) -> String {
    let columns: Vec<String> = spec
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        spec.name,
        columns.join(", ")
    )
}

/// Commande COPY pour les colonnes du dataset
pub fn copy_sql(table: &str, columns: &[&str]) -> String {
    let columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER ',', QUOTE '\"', ESCAPE '\"', NULL '')",
        table,
        columns.join(", ")
    )
}

async fn copy_rows(
    tx: &LoadTransaction<'_>,
    table: &str,
    plan: &WritePlan<'_>,
) -> Result<u64, SinkError> {
    let columns: Vec<&str> = plan.dataset.schema().names().collect();
    let sink = tx.transaction().copy_in(&copy_sql(table, &columns)).await?;
    let mut pinned = std::pin::pin!(sink);

    let mut buf = BytesMut::with_capacity(64 * 1024);
    for (i, row) in plan.dataset.rows().iter().enumerate() {
        write_csv_row(&mut buf, row)?;
        if (i + 1) % COPY_CHUNK_ROWS == 0 {
            pinned.as_mut().send(buf.split().freeze()).await?;
        }
    }
    if !buf.is_empty() {
        pinned.as_mut().send(buf.split().freeze()).await?;
    }

    Ok(pinned.as_mut().finish().await?)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Écrit une ligne CSV terminée par `\n`
///
/// Null est un champ vide non quoté ; le texte est toujours quoté, donc une
/// chaîne vide reste distincte de Null.
pub fn write_csv_row(buf: &mut BytesMut, row: &[Value]) -> Result<(), SinkError> {
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            buf.extend_from_slice(b",");
        }
        match value {
            Value::Null => {}
            Value::Text(s) => push_csv_text_field(buf, s),
            Value::Integer(v) => buf.extend_from_slice(v.to_string().as_bytes()),
            Value::Float(v) => buf.extend_from_slice(format_float(*v).as_bytes()),
            Value::Boolean(v) => buf.extend_from_slice(if *v { b"true" } else { b"false" }),
            Value::Timestamp(t) => buf.extend_from_slice(t.to_rfc3339().as_bytes()),
            Value::Geometry(g) => buf.extend_from_slice(g.to_hex().as_bytes()),
            Value::Shape(_) => {
                return Err(SinkError::Failed(
                    "raw geometry reached the sink without canonical encoding".into(),
                ))
            }
        }
    }
    buf.extend_from_slice(b"\n");
    Ok(())
}

fn push_csv_text_field(buf: &mut BytesMut, value: &str) {
    buf.extend_from_slice(b"\"");
    for b in value.as_bytes() {
        match *b {
            b'"' => buf.extend_from_slice(b"\"\""),
            _ => buf.extend_from_slice(&[*b]),
        }
    }
    buf.extend_from_slice(b"\"");
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::plan::ColumnSpec;

    #[test]
    fn test_csv_row_quoting() {
        let mut buf = BytesMut::new();
        write_csv_row(
            &mut buf,
            &[
                Value::from("臺北市\"中正區\""),
                Value::Null,
                Value::from(""),
                Value::Integer(-1),
                Value::Float(121.5),
                Value::Boolean(true),
            ],
        )
        .unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "\"臺北市\"\"中正區\"\"\",,\"\",-1,121.5,true\n"
        );
    }

    #[test]
    fn test_csv_keeps_newlines_inside_quotes() {
        let mut buf = BytesMut::new();
        write_csv_row(&mut buf, &[Value::from("a\nb")]).unwrap();
        assert_eq!(&buf[..], b"\"a\nb\"\n");
    }

    #[test]
    fn test_raw_shape_rejected() {
        let mut buf = BytesMut::new();
        let shape = citygeo::Shape::Point(citygeo::Coord::xy(0.0, 0.0));
        assert!(write_csv_row(&mut buf, &[Value::Shape(shape)]).is_err());
    }

    #[test]
    fn test_create_table_sql() {
        let spec = TableSpec {
            name: "work_sidewalk".into(),
            columns: vec![
                ColumnSpec {
                    name: "name".into(),
                    sql_type: "text".into(),
                },
                ColumnSpec {
                    name: "wkb_geometry".into(),
                    sql_type: "geometry(MultiPolygon, 4326)".into(),
                },
            ],
        };
        assert_eq!(
            create_table_sql(&spec),
            "CREATE TABLE IF NOT EXISTS work_sidewalk (\"name\" text, \"wkb_geometry\" geometry(MultiPolygon, 4326))"
        );
    }

    #[test]
    fn test_float_format() {
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_float(25.5), "25.5");
    }
}
