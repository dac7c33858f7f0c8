use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Data, Shape, Tensor},
};
use derive_new::new;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::PreprocessError,
    preprocessing::{KMeans, RobustScaler},
};

/// Input keys and the feature names the fitted preprocessors know them by.
pub const FIELD_MAPPING: [(&str, &str); 7] = [
    ("ph_suelo", "pH del suelo"),
    ("tipo_suelo", "Tipo de suelo"),
    ("textura_suelo", "Textura del suelo"),
    ("temperatura", "Temperatura (°C)"),
    ("precipitacion", "Precipitación (mm)"),
    ("humedad", "Humedad (%)"),
    ("practicas_agricolas", "Prácticas agrícolas"),
];

pub const CATEGORICAL_FEATURES: [&str; 2] = ["Tipo de suelo", "Textura del suelo"];

pub const CLUSTER_FEATURE: &str = "Cluster";

/// One farm observation as received on the command line. Key order is kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct InputRecord(IndexMap<String, Value>);

impl InputRecord {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Flag(bool),
    Text(String),
    Missing,
}

impl Cell {
    fn from_value(column: &str, value: &Value) -> Result<Self, PreprocessError> {
        match value {
            Value::Null => Ok(Cell::Missing),
            Value::Bool(flag) => Ok(Cell::Flag(*flag)),
            Value::String(text) => Ok(Cell::Text(text.clone())),
            Value::Number(number) => number.as_f64().map(Cell::Number).ok_or_else(|| {
                PreprocessError::UnsupportedValue {
                    column: column.to_string(),
                    value: number.to_string(),
                }
            }),
            other => Err(PreprocessError::UnsupportedValue {
                column: column.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Category label used in dummy column names. `None` for missing values.
    fn label(&self) -> Option<String> {
        match self {
            Cell::Number(n) => Some(n.to_string()),
            Cell::Flag(flag) => Some(flag.to_string()),
            Cell::Text(text) => Some(text.clone()),
            Cell::Missing => None,
        }
    }
}

/// One-hot encoding with the first (sorted) category dropped. Categories are the
/// distinct non-missing values found in `values`, nothing else.
pub fn one_hot_drop_first(column: &str, values: &[Cell]) -> Vec<(String, Vec<bool>)> {
    let labels: Vec<Option<String>> = values.iter().map(Cell::label).collect();
    let mut categories: Vec<&String> = labels.iter().flatten().collect();
    categories.sort();
    categories.dedup();

    categories
        .into_iter()
        .skip(1)
        .map(|category| {
            let indicator = labels
                .iter()
                .map(|label| label.as_ref() == Some(category))
                .collect();
            (format!("{column}_{category}"), indicator)
        })
        .collect()
}

/// Single-row table of named cells.
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    columns: Vec<(String, Cell)>,
}

impl FeatureFrame {
    pub fn from_record(record: &InputRecord) -> Result<Self, PreprocessError> {
        let columns = record
            .fields()
            .map(|(name, value)| Ok((name.clone(), Cell::from_value(name, value)?)))
            .collect::<Result<Vec<_>, PreprocessError>>()?;
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn push(&mut self, name: &str, cell: Cell) {
        self.columns.push((name.to_string(), cell));
    }

    /// Renames columns in place; names without a mapping are left alone.
    pub fn rename(&mut self, mapping: &[(&str, &str)]) {
        for (name, _) in self.columns.iter_mut() {
            if let Some((_, new_name)) = mapping.iter().find(|(old, _)| *old == name.as_str()) {
                *name = new_name.to_string();
            }
        }
    }

    /// Replaces each categorical column by its drop-first dummies, appended at the end.
    pub fn encode_dummies(&mut self, categorical: &[&str]) -> Result<(), PreprocessError> {
        let mut dummies = Vec::new();
        for column in categorical {
            let idx = self
                .columns
                .iter()
                .position(|(name, _)| name == column)
                .ok_or_else(|| PreprocessError::MissingColumn(column.to_string()))?;
            let (_, cell) = self.columns.remove(idx);
            for (name, indicator) in one_hot_drop_first(column, std::slice::from_ref(&cell)) {
                dummies.push((name, Cell::Flag(indicator[0])));
            }
        }
        self.columns.extend(dummies);
        Ok(())
    }

    /// Columns holding plain numbers, as fed to the clustering model.
    pub fn numeric_columns(&self) -> (Vec<String>, Vec<f64>) {
        self.columns
            .iter()
            .filter_map(|(name, cell)| match cell {
                Cell::Number(n) => Some((name.clone(), *n)),
                _ => None,
            })
            .unzip()
    }

    /// Every column that converts to a float. Flags become 0/1, missing values NaN.
    pub fn scalable_columns(&self) -> (Vec<String>, Vec<f64>) {
        self.columns
            .iter()
            .filter_map(|(name, cell)| {
                let value = match cell {
                    Cell::Number(n) => *n,
                    Cell::Flag(flag) => f64::from(u8::from(*flag)),
                    Cell::Missing => f64::NAN,
                    Cell::Text(text) => {
                        debug!(column = %name, value = %text, "text column left out of scaling");
                        return None;
                    }
                };
                Some((name.clone(), value))
            })
            .unzip()
    }
}

/// Scaled single-row features, named after the columns they came from.
#[derive(Debug, Clone, PartialEq, new)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// Turns a record into the scaled feature row for the classifier.
///
/// The scaler is used twice: once on the numeric columns to place the record in a
/// cluster, then on the full encoded frame. Its width is not reconciled with
/// `expected_features`; a mismatch surfaces when the classifier is fed.
pub fn preprocess_input(
    record: &InputRecord,
    scaler: &RobustScaler,
    kmeans: Option<&KMeans>,
    expected_features: usize,
) -> Result<FeatureVector, PreprocessError> {
    let mut frame = FeatureFrame::from_record(record)?;
    frame.rename(&FIELD_MAPPING);
    frame.encode_dummies(&CATEGORICAL_FEATURES)?;
    debug!(expected_features, columns = frame.len(), "encoded input frame");

    if let Some(kmeans) = kmeans {
        let (names, row) = frame.numeric_columns();
        let cluster_input = scaler.transform(&names, &row)?;
        let cluster = kmeans.predict(&cluster_input)?;
        debug!(cluster, "assigned cluster");
        frame.push(CLUSTER_FEATURE, Cell::Number(cluster as f64));
    }

    let (names, row) = frame.scalable_columns();
    let values = scaler.transform(&names, &row)?;
    Ok(FeatureVector::new(names, values))
}

#[derive(new)]
pub struct FeatureBatcher<B: Backend> {
    device: B::Device,
}

/// Stacks feature rows into a `[rows, width]` tensor. Rows must share a width.
impl<B: Backend> Batcher<FeatureVector, Tensor<B, 2>> for FeatureBatcher<B> {
    fn batch(&self, items: Vec<FeatureVector>) -> Tensor<B, 2> {
        let rows = items
            .iter()
            .map(|item| {
                let values = item.values.iter().map(|v| *v as f32).collect::<Vec<f32>>();
                Data::new(values, Shape::new([1, item.width()]))
            })
            .map(|data| Tensor::<B, 2>::from_data(data.convert(), &self.device))
            .collect::<Vec<Tensor<B, 2>>>();

        Tensor::cat(rows, 0).to_device(&self.device)
    }
}
