//! Class balancing applied to a training partition before a model is fit.
//!
//! A balancing method either resamples the table (oversampling, SMOTE
//! variants, ADASYN, undersampling) or leaves it untouched and returns
//! per-sample weights (`balance_weights`). Label vectors whose mean is
//! exactly 0.5 are treated as already balanced and pass through as-is.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

use crate::dataset::{class_counts, label_mean};
use crate::error::{Allowed, DecoderError, Result};
use crate::resampling::{
    Adasyn, RandomOverSampler, RandomUnderSampler, ResampleError, Resampler, Smote,
};

/// Accepted balancing names.
pub const BALANCING_METHODS: [&str; 9] = [
    "oversample",
    "smote",
    "borderline_smote",
    "adasyn",
    "undersample",
    "balance_weights",
    "true",
    "false",
    "none",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancingMethod {
    Oversample,
    Smote,
    BorderlineSmote,
    Adasyn,
    Undersample,
    BalanceWeights,
    Disabled,
}

impl BalancingMethod {
    /// Parse an optional balancing name; `None` disables balancing.
    pub fn parse(name: Option<&str>) -> Result<Self> {
        match name {
            None => Ok(BalancingMethod::Disabled),
            Some(name) => name.parse(),
        }
    }

    fn resampler(&self) -> Option<Box<dyn Resampler>> {
        match self {
            BalancingMethod::Oversample => Some(Box::new(RandomOverSampler)),
            BalancingMethod::Smote => Some(Box::new(Smote::new())),
            BalancingMethod::BorderlineSmote => Some(Box::new(Smote::borderline())),
            BalancingMethod::Adasyn => Some(Box::new(Adasyn::new())),
            BalancingMethod::Undersample => Some(Box::new(RandomUnderSampler)),
            BalancingMethod::BalanceWeights | BalancingMethod::Disabled => None,
        }
    }
}

impl FromStr for BalancingMethod {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "oversample" | "true" => Ok(BalancingMethod::Oversample),
            "smote" => Ok(BalancingMethod::Smote),
            "borderline_smote" => Ok(BalancingMethod::BorderlineSmote),
            "adasyn" => Ok(BalancingMethod::Adasyn),
            "undersample" => Ok(BalancingMethod::Undersample),
            "balance_weights" => Ok(BalancingMethod::BalanceWeights),
            "false" | "none" => Ok(BalancingMethod::Disabled),
            _ => Err(DecoderError::BalancingMethod {
                input: s.to_string(),
                allowed: Allowed(BALANCING_METHODS.to_vec()),
            }),
        }
    }
}

impl fmt::Display for BalancingMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BalancingMethod::Oversample => "oversample",
            BalancingMethod::Smote => "smote",
            BalancingMethod::BorderlineSmote => "borderline_smote",
            BalancingMethod::Adasyn => "adasyn",
            BalancingMethod::Undersample => "undersample",
            BalancingMethod::BalanceWeights => "balance_weights",
            BalancingMethod::Disabled => "none",
        };
        f.write_str(name)
    }
}

/// Output of a balancing call.
#[derive(Debug, Clone)]
pub struct Balanced {
    pub data: Array2<f64>,
    pub labels: Array1<usize>,
    pub sample_weight: Option<Array1<f64>>,
}

/// Balance class sizes with the named method.
///
/// # Arguments
///
/// * `data` - Feature matrix, shape (n_samples, n_features)
/// * `labels` - Class of each row
/// * `method` - Balancing name, `None` to disable
/// * `rng` - Source of randomness for the resamplers
///
/// # Returns
///
/// The (possibly resampled) table, and sample weights when `method` is `balance_weights`.
pub fn balance_samples(
    data: &Array2<f64>,
    labels: &Array1<usize>,
    method: Option<&str>,
    rng: &mut StdRng,
) -> Result<Balanced> {
    let method = BalancingMethod::parse(method)?;
    balance_with(data, labels, method, rng)
}

/// Balance class sizes with an already parsed method.
pub fn balance_with(
    data: &Array2<f64>,
    labels: &Array1<usize>,
    method: BalancingMethod,
    rng: &mut StdRng,
) -> Result<Balanced> {
    let unchanged = || Balanced {
        data: data.clone(),
        labels: labels.clone(),
        sample_weight: None,
    };

    if label_mean(labels) == 0.5 {
        log::trace!("Labels already balanced, skipping {}", method);
        return Ok(unchanged());
    }

    if method == BalancingMethod::BalanceWeights {
        return Ok(Balanced {
            sample_weight: Some(compute_sample_weight(labels)),
            ..unchanged()
        });
    }

    let Some(resampler) = method.resampler() else {
        return Ok(unchanged());
    };

    match resampler.fit_resample(data, labels, rng) {
        Ok((resampled_data, resampled_labels)) => {
            log::trace!(
                "Balanced with {}: {:?} -> {:?}",
                resampler.name(),
                class_counts(labels),
                class_counts(&resampled_labels)
            );
            Ok(Balanced {
                data: resampled_data,
                labels: resampled_labels,
                sample_weight: None,
            })
        }
        Err(ResampleError::NoSamplesGenerated) if method == BalancingMethod::Adasyn => {
            log::debug!("ADASYN generated no samples, keeping the original data");
            Ok(unchanged())
        }
        Err(err) => Err(err.into()),
    }
}

/// Balanced class weights: `n_samples / (n_classes * count(class))` for every row.
pub fn compute_sample_weight(labels: &Array1<usize>) -> Array1<f64> {
    let counts = class_counts(labels);
    let n_samples = labels.len() as f64;
    let n_classes = counts.len() as f64;
    labels.mapv(|label| n_samples / (n_classes * counts[&label] as f64))
}
