use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;
use rusqlite::{params, Connection};
use serde::Serialize;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len() as u64) as usize]
    }
}

#[derive(Debug, Serialize)]
struct Inspection {
    inspection_id: i64,
    asset_type: String,
    site: String,
    inspector: String,
    status: String,
    inspection_date: NaiveDate,
    due_date: NaiveDate,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Result<Vec<Inspection>> {
    let asset_types = ["Pump", "Valve", "Tank", "Pipeline", "Compressor"];
    let sites = ["North Plant", "South Plant", "Harbour Depot"];
    let inspectors = ["A. Okafor", "B. Lindqvist", "C. Tanaka", "D. Moreau"];
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).context("invalid start date")?;

    let mut out = Vec::with_capacity(rows);
    for id in 0..rows {
        let due = start
            .checked_add_days(Days::new(rng.below(700)))
            .context("due date out of range")?;
        // Most inspections land within a fortnight of the due date, either side.
        let inspected = due
            .checked_add_days(Days::new(rng.below(28)))
            .and_then(|d| d.checked_sub_days(Days::new(14)))
            .context("inspection date out of range")?;

        let roll = rng.next_f64();
        let status = if roll < 0.72 {
            "Passed"
        } else if roll < 0.92 {
            "Failed"
        } else {
            "Pending"
        };

        out.push(Inspection {
            inspection_id: id as i64 + 1,
            asset_type: rng.pick(&asset_types).to_string(),
            site: rng.pick(&sites).to_string(),
            inspector: rng.pick(&inspectors).to_string(),
            status: status.to_string(),
            inspection_date: inspected,
            due_date: due,
        });
    }
    Ok(out)
}

fn write_csv(path: &str, rows: &[Inspection]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn string_column<'a>(rows: &'a [Inspection], f: impl Fn(&'a Inspection) -> &'a str) -> StringArray {
    StringArray::from(rows.iter().map(f).collect::<Vec<&str>>())
}

fn write_parquet(path: &str, rows: &[Inspection]) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("invalid epoch")?;
    let days = |d: NaiveDate| (d - epoch).num_days() as i32;

    let schema = Arc::new(Schema::new(vec![
        Field::new("inspection_id", DataType::Int64, false),
        Field::new("asset_type", DataType::Utf8, false),
        Field::new("site", DataType::Utf8, false),
        Field::new("inspector", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("inspection_date", DataType::Date32, false),
        Field::new("due_date", DataType::Date32, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.inspection_id))),
            Arc::new(string_column(rows, |r| r.asset_type.as_str())),
            Arc::new(string_column(rows, |r| r.site.as_str())),
            Arc::new(string_column(rows, |r| r.inspector.as_str())),
            Arc::new(string_column(rows, |r| r.status.as_str())),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| days(r.inspection_date)))),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| days(r.due_date)))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_sqlite(path: &str, rows: &[Inspection]) -> Result<()> {
    if std::path::Path::new(path).exists() {
        std::fs::remove_file(path).with_context(|| format!("replacing {path}"))?;
    }
    let mut conn = Connection::open(path)?;
    conn.execute(
        r#"
        CREATE TABLE inspections (
            inspection_id INTEGER PRIMARY KEY,
            asset_type TEXT NOT NULL,
            site TEXT NOT NULL,
            inspector TEXT NOT NULL,
            status TEXT NOT NULL,
            inspection_date TEXT NOT NULL,
            due_date TEXT NOT NULL
        );
        "#,
        [],
    )?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO inspections VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for r in rows {
            stmt.execute(params![
                r.inspection_id,
                r.asset_type,
                r.site,
                r.inspector,
                r.status,
                r.inspection_date.to_string(),
                r.due_date.to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(600, &mut rng)?;

    write_csv("sample_inspections.csv", &rows)?;
    write_parquet("sample_inspections.parquet", &rows)?;
    write_sqlite("sample_inspections.db", &rows)?;

    println!(
        "Wrote {} inspections to sample_inspections.csv, .parquet and .db (table 'inspections')",
        rows.len()
    );
    Ok(())
}
