use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use bincode::Options;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::balancing::{balance_with, Balanced, BalancingMethod};
use crate::dataset::check_rows;
use crate::error::{DecoderError, Result};
use crate::scoring::ScoringMethod;
use crate::splitting::{validation_split, ValidationSplit};

/// Share of groups kept for training when carving out an early-stopping set.
pub const VALIDATION_TRAIN_FRACTION: f64 = 0.8;

/// Configuration shared by every decoder backend.
///
/// The balancing name is kept as given and only parsed when a fit needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderSettings {
    pub scoring: ScoringMethod,
    pub balancing: Option<String>,
    pub optimize: bool,
    pub seed: Option<u64>,
}

impl DecoderSettings {
    pub fn new(scoring: ScoringMethod, balancing: Option<&str>, optimize: bool) -> Self {
        DecoderSettings {
            scoring,
            balancing: balancing.map(str::to_lowercase),
            optimize,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Fresh generator for one fit call: seeded when a seed is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn balancing_method(&self) -> Result<BalancingMethod> {
        BalancingMethod::parse(self.balancing.as_deref())
    }

    pub fn balance(&self, data: &Array2<f64>, labels: &Array1<usize>, rng: &mut StdRng) -> Result<Balanced> {
        balance_with(data, labels, self.balancing_method()?, rng)
    }

    pub fn validation_split(
        &self,
        data: &Array2<f64>,
        labels: &Array1<usize>,
        groups: &Array1<i64>,
        rng: &mut StdRng,
    ) -> Result<ValidationSplit> {
        validation_split(data, labels, groups, VALIDATION_TRAIN_FRACTION, rng)
    }

    /// Discriminant models accept neither sample weights nor tuning.
    pub(crate) fn reject_weights_and_tuning(&self, backend: &'static str) -> Result<()> {
        if self.balancing.as_deref() == Some("balance_weights") {
            return Err(DecoderError::IncompatibleOption {
                backend,
                reason: "sample weights cannot be balanced for this model, use `oversample`, \
                         `undersample` or no balancing"
                    .to_string(),
            });
        }
        if self.optimize {
            return Err(DecoderError::IncompatibleOption {
                backend,
                reason: "hyperparameter optimization is not available for this model, set \
                         `optimize` to false"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Data a model was last trained on, after balancing.
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
    pub data: Array2<f64>,
    pub labels: Array1<usize>,
    /// Groups passed to the fit call, one per input row. Not row-aligned with
    /// `data` once the validation split or resampling has dropped or added rows.
    pub groups: Array1<i64>,
    pub sample_weight: Option<Array1<f64>>,
}

impl TrainingSnapshot {
    pub(crate) fn new(balanced: Balanced, groups: &Array1<i64>) -> Self {
        TrainingSnapshot {
            data: balanced.data,
            labels: balanced.labels,
            groups: groups.clone(),
            sample_weight: balanced.sample_weight,
        }
    }
}

/// Borrowed training data a tuning objective evaluates.
#[derive(Debug, Clone, Copy)]
pub struct FitContext<'a> {
    pub data: &'a Array2<f64>,
    pub labels: &'a Array1<usize>,
    pub groups: &'a Array1<i64>,
}

impl<'a> FitContext<'a> {
    pub fn new(data: &'a Array2<f64>, labels: &'a Array1<usize>, groups: &'a Array1<i64>) -> Result<Self> {
        check_rows(data, labels, groups)?;
        Ok(FitContext { data, labels, groups })
    }
}

/// `path` with its extension replaced by the backend's.
pub fn model_path(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

/// Write a model as bincode, preceded by the backend name.
pub(crate) fn save_bincode<T: Serialize>(
    backend: &str,
    model: &T,
    path: &Path,
    extension: &str,
) -> Result<PathBuf> {
    let path = model_path(path, extension);
    let mut writer = BufWriter::new(File::create(&path)?);
    bincode::serialize_into(&mut writer, backend)?;
    bincode::serialize_into(&mut writer, model)?;
    writer.flush()?;
    log::info!("Saved {} model to {}", backend, path.display());
    Ok(path)
}

/// Read a model written by [`save_bincode`] for the same backend.
pub(crate) fn load_bincode<T: DeserializeOwned>(backend: &str, path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    // a length prefix read from a foreign file must not exceed what the file holds
    let options = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(bytes.len() as u64);
    let mut reader = bytes.as_slice();
    let stored: String = options.deserialize_from(&mut reader)?;
    if stored != backend {
        return Err(DecoderError::Serialization(format!(
            "{} holds a {} model, expected {}",
            path.display(),
            stored,
            backend
        )));
    }
    let model = options.deserialize_from(&mut reader)?;
    log::info!("Loaded {} model from {}", backend, path.display());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_path_replaces_extension() {
        assert_eq!(model_path(Path::new("out/model.pickle"), "lda"), PathBuf::from("out/model.lda"));
        assert_eq!(model_path(Path::new("out/model"), "xgb"), PathBuf::from("out/model.xgb"));
    }

    #[test]
    fn settings_lowercase_balancing_and_parse_lazily() {
        let settings = DecoderSettings::new(ScoringMethod::BalancedAccuracy, Some("SMOTE"), false);
        assert_eq!(settings.balancing.as_deref(), Some("smote"));
        assert_eq!(settings.balancing_method().unwrap(), BalancingMethod::Smote);

        let bogus = DecoderSettings::new(ScoringMethod::BalancedAccuracy, Some("bootstrap"), false);
        assert!(matches!(
            bogus.balancing_method(),
            Err(DecoderError::BalancingMethod { .. })
        ));
    }

    #[test]
    fn seeded_settings_repeat_their_stream() {
        use rand::Rng;
        let settings = DecoderSettings::new(ScoringMethod::LogLoss, None, false).with_seed(Some(3));
        let a: u64 = settings.rng().gen();
        let b: u64 = settings.rng().gen();
        assert_eq!(a, b);
    }
}
