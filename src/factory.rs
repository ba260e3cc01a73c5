use std::fmt;
use std::str::FromStr;

use crate::config::DecoderConfig;
use crate::decoders::{
    CatBoostDecoder, Decoder, DecoderSettings, DummyDecoder, LdaDecoder, LogisticDecoder, QdaDecoder,
    XgbDecoder,
};
use crate::error::{Allowed, DecoderError, Result};
use crate::scoring::ScoringMethod;

pub const CLASSIFIERS: [&str; 6] = ["catboost", "dummy", "lda", "lr", "qda", "xgb"];

/// Supported decoder backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    CatBoost,
    Dummy,
    Lda,
    Lr,
    Qda,
    Xgb,
}

impl FromStr for ClassifierKind {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "catboost" => Ok(ClassifierKind::CatBoost),
            "dummy" => Ok(ClassifierKind::Dummy),
            "lda" => Ok(ClassifierKind::Lda),
            "lr" => Ok(ClassifierKind::Lr),
            "qda" => Ok(ClassifierKind::Qda),
            "xgb" => Ok(ClassifierKind::Xgb),
            _ => Err(DecoderError::DecoderNotFound {
                input: s.to_lowercase(),
                allowed: Allowed(CLASSIFIERS.to_vec()),
            }),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ClassifierKind::CatBoost => "catboost",
            ClassifierKind::Dummy => "dummy",
            ClassifierKind::Lda => "lda",
            ClassifierKind::Lr => "lr",
            ClassifierKind::Qda => "qda",
            ClassifierKind::Xgb => "xgb",
        };
        f.write_str(name)
    }
}

/// Build a boxed, unfitted decoder for an already resolved backend.
///
/// The balancing name is only checked when the decoder is fitted; the
/// discriminant backends still reject sample weights and tuning here.
pub fn build_decoder(kind: ClassifierKind, settings: DecoderSettings) -> Result<Box<dyn Decoder>> {
    let decoder: Box<dyn Decoder> = match kind {
        ClassifierKind::CatBoost => Box::new(CatBoostDecoder::new(settings)),
        ClassifierKind::Dummy => Box::new(DummyDecoder::new(settings)),
        ClassifierKind::Lda => Box::new(LdaDecoder::new(settings)?),
        ClassifierKind::Lr => Box::new(LogisticDecoder::new(settings)),
        ClassifierKind::Qda => Box::new(QdaDecoder::new(settings)?),
        ClassifierKind::Xgb => Box::new(XgbDecoder::new(settings)),
    };
    log::debug!("Created {} decoder", kind);
    Ok(decoder)
}

/// Create a decoder from case-insensitive classifier and scoring names.
///
/// # Arguments
///
/// * `classifier` - One of [`CLASSIFIERS`]
/// * `scoring` - `balanced_accuracy` or `log_loss`
/// * `balancing` - Balancing method name, `None` to disable
/// * `optimize` - Tune hyperparameters before the final fit
pub fn create_decoder(
    classifier: &str,
    scoring: &str,
    balancing: Option<&str>,
    optimize: bool,
) -> Result<Box<dyn Decoder>> {
    create_decoder_with_seed(classifier, scoring, balancing, optimize, None)
}

/// [`create_decoder`] with a fixed seed for every random draw of a fit.
pub fn create_decoder_with_seed(
    classifier: &str,
    scoring: &str,
    balancing: Option<&str>,
    optimize: bool,
    seed: Option<u64>,
) -> Result<Box<dyn Decoder>> {
    let kind: ClassifierKind = classifier.parse()?;
    let scoring: ScoringMethod = scoring.parse()?;
    let settings = DecoderSettings::new(scoring, balancing, optimize).with_seed(seed);
    build_decoder(kind, settings)
}

pub fn create_decoder_from_config(config: &DecoderConfig) -> Result<Box<dyn Decoder>> {
    create_decoder_with_seed(
        &config.classifier,
        &config.scoring,
        config.balancing.as_deref(),
        config.optimize,
        config.seed,
    )
}
