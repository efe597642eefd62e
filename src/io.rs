use std::{
    fs,
    path::{Path, PathBuf},
};

use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{IoError, PipelineResult},
    polars_ext::polars_err,
};

// ================================================================================================
// Traits
// ================================================================================================

/// A named table produced by the pipeline.
pub trait Table {
    fn as_df(&self) -> &DataFrame;
}

pub trait TableName {
    fn base_name(&self) -> String;

    fn filename(&self, ext: FileExtension) -> String {
        format!("{}.{}", self.base_name(), ext)
    }
}

pub trait ToCsv {
    /// Renders the table as comma-separated text with a header row.
    ///
    /// Dates are written as `YYYY-MM-DD`; missing values as empty fields.
    fn to_csv_bytes(&self) -> PipelineResult<Vec<u8>>;
}

// ================================================================================================
// Blanket Implementations
// ================================================================================================

impl<T> ToCsv for T
where
    T: Table,
{
    fn to_csv_bytes(&self) -> PipelineResult<Vec<u8>> {
        let mut df = self.as_df().clone();
        let mut buf = Vec::with_capacity(df.height() * df.width() * (1 << 3));
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut df)
            .map_err(polars_err("csv rendering"))?;
        Ok(buf)
    }
}

/// A fully rendered output file, waiting to be written.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn csv<T>(table: &T) -> PipelineResult<Self>
    where
        T: Table + TableName,
    {
        Ok(Self {
            file_name: table.filename(FileExtension::Csv),
            bytes: table.to_csv_bytes()?,
        })
    }

    pub fn json(base_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{base_name}.{}", FileExtension::Json),
            bytes,
        }
    }
}

/// Writes already rendered artifacts into `dir`, creating it if needed.
///
/// Nothing touches the file system before this call, so a run that fails in
/// any stage leaves no partial output behind.
pub fn commit(dir: impl AsRef<Path>, artifacts: &[Artifact]) -> PipelineResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| IoError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    artifacts
        .iter()
        .map(|artifact| {
            let path = dir.join(&artifact.file_name);
            fs::write(&path, &artifact.bytes).map_err(|source| IoError::Write {
                path: path.clone(),
                source,
            })?;
            Ok(path)
        })
        .collect()
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FileExtension {
    Csv,
    Json,
}
