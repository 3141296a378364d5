//! Evaluation aggregator for sequence-pair classifiers.
//!
//! The model and the batch loader are traits so any inference backend can be
//! plugged in. An [`Evaluation`] runs every batch through the model, pools the
//! logits, and reports loss, accuracy, binary F1, and a per-class report. Each
//! call appends a block to `{model_output_dir}/{experiment}/eval_results.txt`
//! and can persist a prediction snapshot per epoch.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EvalSplit, EvaluationConfig};
use crate::constants::eval::{POSITIVE_CLASS, RESULTS_FILE, SNAPSHOT_EXTENSION};
use crate::errors::PrepError;
use crate::metrics::{accuracy, argmax_rows, binary_f1, classification_report, softmax_rows};
use crate::transport::fs::ensure_parent_dir;

/// Compute device handed through to the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,
    /// CUDA device by ordinal.
    Cuda(usize),
}

/// One tokenized batch. All per-example vectors share the batch length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalBatch {
    /// Token ids, one row per example.
    pub input_ids: Vec<Vec<i64>>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<Vec<i64>>,
    /// Segment ids; dropped for models without them.
    pub token_type_ids: Vec<Vec<i64>>,
    /// Gold labels.
    pub labels: Vec<usize>,
}

impl EvalBatch {
    /// Number of examples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the batch holds no examples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Inputs of one forward pass. `token_type_ids` is `None` for model families
/// that do not take segment ids.
#[derive(Clone, Copy, Debug)]
pub struct ModelInputs<'a> {
    /// Token ids of the batch.
    pub input_ids: &'a [Vec<i64>],
    /// Padding mask of the batch.
    pub attention_mask: &'a [Vec<i64>],
    /// `None` when the model family takes no segment ids.
    pub token_type_ids: Option<&'a [Vec<i64>]>,
    /// Gold labels of the batch.
    pub labels: &'a [usize],
}

/// Output of one forward pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelOutput {
    /// Batch loss; a replicated model may report one value per replica.
    pub loss: Vec<f32>,
    /// One row of `n_labels` scores per example.
    pub logits: Vec<Vec<f32>>,
}

/// Classifier evaluated by [`Evaluation`].
pub trait EvalModel {
    /// Switch to inference mode (dropout off). Default: no-op.
    fn eval_mode(&mut self) {}

    /// Run one batch without gradient tracking.
    fn forward(
        &mut self,
        inputs: &ModelInputs<'_>,
        device: Device,
    ) -> Result<ModelOutput, PrepError>;
}

/// Source of evaluation batches. Iterated once per [`Evaluation::evaluate`] call.
pub trait DataLoader {
    /// Batches in a stable order.
    fn batches(&self) -> Box<dyn Iterator<Item = Result<EvalBatch, PrepError>> + '_>;
}

impl DataLoader for Vec<EvalBatch> {
    fn batches(&self) -> Box<dyn Iterator<Item = Result<EvalBatch, PrepError>> + '_> {
        Box::new(self.iter().cloned().map(Ok))
    }
}

/// Scalar metrics of one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Mean of the per-batch mean losses.
    pub eval_loss: f64,
    /// Fraction of predictions equal to the label.
    pub simple_accuracy: f64,
    /// Binary F1 of the positive class.
    pub f1_score: f64,
}

impl EvalResult {
    /// `(name, value)` pairs in key order.
    pub fn entries(&self) -> [(&'static str, f64); 3] {
        [
            ("eval_loss", self.eval_loss),
            ("f1_score", self.f1_score),
            ("simple_accuracy", self.simple_accuracy),
        ]
    }
}

/// Metrics plus the rendered classification report.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalOutcome {
    /// Aggregate metrics.
    pub result: EvalResult,
    /// Per-class precision/recall/F1 table.
    pub report: String,
}

/// Per-epoch prediction dump used for post-hoc analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionSnapshot {
    /// Epoch the predictions were made after.
    pub epoch: usize,
    /// Split name, `validation` or `test`.
    pub split: String,
    /// Argmax class per example.
    pub predictions: Vec<usize>,
    /// Softmax of each logit row.
    pub probabilities: Vec<Vec<f32>>,
    /// Gold label per row.
    pub labels: Vec<usize>,
}

impl PredictionSnapshot {
    /// Read a snapshot written by [`Evaluation::evaluate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PrepError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pools logits and labels across batches.
#[derive(Debug, Default)]
struct Accumulator {
    steps: usize,
    loss_sum: f64,
    logits: Vec<Vec<f32>>,
    labels: Vec<usize>,
}

impl Accumulator {
    fn push(&mut self, output: ModelOutput, labels: Vec<usize>) {
        // `check_output` guarantees at least one loss value.
        let batch_loss = output.loss.iter().map(|&value| f64::from(value)).sum::<f64>()
            / output.loss.len() as f64;
        self.loss_sum += batch_loss;
        self.steps += 1;
        self.logits.extend(output.logits);
        self.labels.extend(labels);
    }
}

/// Evaluation aggregator bound to one experiment and held-out split.
#[derive(Clone, Debug)]
pub struct Evaluation {
    config: EvaluationConfig,
    results_path: PathBuf,
    snapshot_prefix: PathBuf,
}

impl Evaluation {
    /// Aggregator for the split named in `config`.
    pub fn new(config: EvaluationConfig) -> Self {
        let experiment_dir = config.model_output_dir.join(&config.experiment);
        let results_path = experiment_dir.join(RESULTS_FILE);
        let snapshot_prefix = experiment_dir.join(config.split.as_str());
        Self {
            config,
            results_path,
            snapshot_prefix,
        }
    }

    /// Settings this aggregator was built with.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Split this aggregator reports on.
    pub fn split(&self) -> EvalSplit {
        self.config.split
    }

    /// `{model_output_dir}/{experiment}/eval_results.txt`
    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// `{model_output_dir}/{experiment}/{split}_{epoch}.json`
    pub fn snapshot_path(&self, epoch: usize) -> PathBuf {
        let mut name = self.snapshot_prefix.clone().into_os_string();
        name.push(format!("_{epoch}.{SNAPSHOT_EXTENSION}"));
        PathBuf::from(name)
    }

    /// Evaluate `model` on every batch of `loader`.
    ///
    /// Appends a results block to [`Evaluation::results_path`]. With
    /// `persist_predictions`, also writes the epoch's snapshot, replacing any
    /// earlier one for the same epoch.
    pub fn evaluate<M, L>(
        &self,
        model: &mut M,
        loader: &L,
        device: Device,
        epoch: usize,
        persist_predictions: bool,
    ) -> Result<EvalOutcome, PrepError>
    where
        M: EvalModel + ?Sized,
        L: DataLoader + ?Sized,
    {
        model.eval_mode();
        let mut acc = Accumulator::default();
        for batch in loader.batches() {
            let batch = batch?;
            let output = {
                let inputs = self.inputs_for(&batch);
                model.forward(&inputs, device)?
            };
            self.check_output(&batch, &output, acc.steps)?;
            acc.push(output, batch.labels);
        }
        if acc.steps == 0 {
            return Err(PrepError::EmptyEvaluationSet);
        }
        debug!(
            split = self.split().as_str(),
            steps = acc.steps,
            examples = acc.labels.len(),
            "pooled evaluation batches"
        );

        let predictions = argmax_rows(&acc.logits);
        let result = EvalResult {
            eval_loss: acc.loss_sum / acc.steps as f64,
            simple_accuracy: accuracy(&predictions, &acc.labels),
            f1_score: binary_f1(&predictions, &acc.labels, POSITIVE_CLASS),
        };
        let report = classification_report(&predictions, &acc.labels);

        self.append_results(epoch, &result, &report)?;
        if persist_predictions {
            let snapshot = PredictionSnapshot {
                epoch,
                split: self.split().as_str().to_string(),
                probabilities: softmax_rows(&acc.logits),
                predictions,
                labels: acc.labels,
            };
            self.write_snapshot(&snapshot)?;
        }
        Ok(EvalOutcome { result, report })
    }

    fn inputs_for<'a>(&self, batch: &'a EvalBatch) -> ModelInputs<'a> {
        ModelInputs {
            input_ids: &batch.input_ids,
            attention_mask: &batch.attention_mask,
            token_type_ids: self
                .config
                .model_type
                .uses_segment_ids()
                .then_some(batch.token_type_ids.as_slice()),
            labels: &batch.labels,
        }
    }

    fn check_output(
        &self,
        batch: &EvalBatch,
        output: &ModelOutput,
        step: usize,
    ) -> Result<(), PrepError> {
        if output.loss.is_empty() {
            return Err(PrepError::Configuration(format!(
                "batch {step}: model returned no loss"
            )));
        }
        if output.logits.len() != batch.len() {
            return Err(PrepError::Configuration(format!(
                "batch {step}: model returned {} logit rows for {} labels",
                output.logits.len(),
                batch.len()
            )));
        }
        let n_labels = self.config.n_labels;
        if let Some(row) = output.logits.iter().find(|row| row.len() != n_labels) {
            return Err(PrepError::Configuration(format!(
                "batch {step}: logit row has {} scores, expected n_labels = {n_labels}",
                row.len()
            )));
        }
        if let Some(label) = batch.labels.iter().find(|&&label| label >= n_labels) {
            return Err(PrepError::Configuration(format!(
                "batch {step}: label {label} out of range for n_labels = {n_labels}"
            )));
        }
        Ok(())
    }

    fn append_results(
        &self,
        epoch: usize,
        result: &EvalResult,
        report: &str,
    ) -> Result<(), PrepError> {
        let header = format!(
            "***** {} results after epoch {epoch} *****",
            self.split().as_str()
        );
        info!("{header}");
        let mut block = format!("{header}\n");
        for (key, value) in result.entries() {
            info!("  {key} = {value:?}");
            block.push_str(&format!("{key}: {value:?}\n"));
        }
        info!("\n{report}");
        block.push_str(report);
        block.push('\n');

        ensure_parent_dir(&self.results_path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.results_path)?;
        file.write_all(block.as_bytes())?;
        Ok(())
    }

    fn write_snapshot(&self, snapshot: &PredictionSnapshot) -> Result<(), PrepError> {
        let path = self.snapshot_path(snapshot.epoch);
        ensure_parent_dir(&path)?;
        fs::write(&path, serde_json::to_vec_pretty(snapshot)?)?;
        debug!(path = %path.display(), "wrote prediction snapshot");
        Ok(())
    }
}
