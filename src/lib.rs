//! Classifier factory for neural decoding experiments.
//!
//! A [`Decoder`](decoders::Decoder) wraps one classifier backend together
//! with a scoring method, a class balancing strategy and an optional
//! Bayesian hyperparameter search. Splits always respect group structure,
//! so trials recorded in one session never end up on both sides of a
//! train/validation boundary.
//!
//! ```no_run
//! use pte_decode::create_decoder;
//! # fn run(x: ndarray::Array2<f64>, y: ndarray::Array1<usize>, groups: ndarray::Array1<i64>) -> pte_decode::Result<()> {
//! let mut decoder = create_decoder("lda", "balanced_accuracy", Some("oversample"), false)?;
//! decoder.fit(&x, &y, &groups)?;
//! let score = decoder.get_score(&x, &y)?;
//! # Ok(())
//! # }
//! ```
pub mod balancing;
pub mod config;
pub mod dataset;
pub mod decoders;
pub mod error;
pub mod factory;
pub mod io;
pub mod logging;
pub mod models;
pub mod optimizer;
pub mod resampling;
pub mod scoring;
pub mod splitting;

pub use balancing::{balance_samples, BalancingMethod, BALANCING_METHODS};
pub use dataset::Dataset;
pub use decoders::{Decoder, DecoderSettings};
pub use error::{DecoderError, Result};
pub use factory::{create_decoder, create_decoder_from_config, create_decoder_with_seed, ClassifierKind, CLASSIFIERS};
pub use scoring::{ScoringMethod, SCORING_METHODS};
