use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;

use pte_decode::logging::init_logging;
use pte_decode::{create_decoder_with_seed, Dataset, CLASSIFIERS};

/// Imbalanced two-class recording: 12 sessions of 40 trials, 30% movement
/// trials whose first two features carry a shifted mean.
fn synthetic_sessions(rng: &mut StdRng) -> Result<Dataset> {
    let noise = Normal::new(0.0, 1.0).context("invalid noise distribution")?;
    let n_sessions = 12;
    let trials = 40;
    let n = n_sessions * trials;

    let y = Array1::from_shape_fn(n, |_| usize::from(rng.gen_bool(0.3)));
    let groups = Array1::from_shape_fn(n, |i| (i / trials) as i64);
    let mut x = Array2::from_shape_fn((n, 4), |_| rng.sample(noise));
    for (i, mut row) in x.axis_iter_mut(Axis(0)).enumerate() {
        if y[i] == 1 {
            row[0] += 1.5;
            row[1] -= 1.0;
        }
    }
    Ok(Dataset::new(x, y, groups)?)
}

fn main() -> Result<()> {
    init_logging();
    let mut rng = StdRng::seed_from_u64(7);
    let dataset = synthetic_sessions(&mut rng)?;
    dataset.log_summary();

    // hold out the last three sessions
    let held_out: Vec<i64> = (9..12).collect();
    let (test, train) = dataset.partition_by_groups(&held_out);
    println!("Train {} trials, test {} trials", train.n_samples(), test.n_samples());

    for name in CLASSIFIERS {
        let mut decoder = create_decoder_with_seed(name, "balanced_accuracy", Some("oversample"), false, Some(1))?;
        let predictions = decoder
            .fit_and_predict(&train.x, &test.x, &train.y, &train.groups)
            .with_context(|| format!("Failed to fit {}", name))?;
        let score = decoder.get_score(&test.x, &test.y)?;
        let positives = predictions.iter().filter(|&&p| p == 1).count();
        println!("{:>9}: balanced accuracy {:.3} ({} predicted movement trials)", name, score, positives);
    }

    let mut tuned = create_decoder_with_seed("lr", "log_loss", Some("balance_weights"), true, Some(1))?;
    tuned.fit(&train.x, &train.y, &train.groups)?;
    println!("Tuned lr log-loss: {:.4}", tuned.get_score(&test.x, &test.y)?);

    let path = std::env::temp_dir().join("pte_decode_demo");
    let written = tuned.save_model(&path)?;
    println!("Saved tuned model to {}", written.display());
    Ok(())
}
