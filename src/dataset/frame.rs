//! Conversion between polars `DataFrame`s and [`Dataset`]
//!
//! Polars is only the ingestion boundary; the pipeline itself works on
//! [`Dataset`].

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use super::{Column, ColumnData, Dataset};
use crate::error::{AutoDsError, Result};

impl Dataset {
    /// Convert a polars frame. Primitive numeric columns become numeric,
    /// everything else (strings, booleans, dates) is read as text.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let name = col.name().to_string();
            if series.dtype().is_primitive_numeric() {
                let casted = series.cast(&DataType::Float64)?;
                let values = casted.f64()?.into_iter().collect();
                columns.push(Column::numeric(name, values));
            } else {
                let casted = series.cast(&DataType::String)?;
                let values = casted
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect();
                columns.push(Column::text(name, values));
            }
        }
        Dataset::new(columns)
    }

    /// Convert back to a polars frame
    pub fn to_frame(&self) -> Result<DataFrame> {
        let columns: Vec<polars::prelude::Column> = self
            .columns()
            .iter()
            .map(|c| match c.data() {
                ColumnData::Numeric(v) => Series::new(c.name().into(), v.as_slice()).into(),
                ColumnData::Text(v) => Series::new(c.name().into(), v.as_slice()).into(),
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// Read a CSV file with a header row
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AutoDsError::Data(format!("file not found: {}", path.display())));
        }
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(1000))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Self::from_frame(&df)
    }

    /// Write the dataset as CSV with a header row
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_frame()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnKind;

    #[test]
    fn test_from_frame_kinds() {
        let df = df! {
            "age" => [31i64, 45, 27],
            "plan" => ["basic", "pro", "basic"],
            "active" => [true, false, true],
        }
        .unwrap();

        let ds = Dataset::from_frame(&df).unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column("age").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("plan").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(ds.column("active").unwrap().display_value(1).as_deref(), Some("false"));
    }

    #[test]
    fn test_frame_round_trip_keeps_missing() {
        let ds = Dataset::new(vec![
            Column::numeric("x", vec![Some(1.5), None]),
            Column::text("s", vec![None, Some("a".into())]),
        ])
        .unwrap();

        let back = Dataset::from_frame(&ds.to_frame().unwrap()).unwrap();
        assert_eq!(back, ds);
    }
}
