use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use pairfolds::source::find_dataset;
use pairfolds::transport::tsv::{read_examples, write_examples};
use pairfolds::{
    Device, EvalBatch, EvalModel, EvalSplit, Evaluation, EvaluationConfig, JoinedExample,
    ModelInputs, ModelOutput, PrepError, PrepareConfig, PredictionSnapshot, SplitLabel,
    prepare_dataset,
};
use tempfile::tempdir;

/// Whitespace tokenizer with a growing vocabulary.
#[derive(Default)]
struct Vocab {
    ids: HashMap<String, i64>,
}

impl Vocab {
    fn encode(&mut self, text: &str) -> Vec<i64> {
        text.split_whitespace()
            .map(|word| {
                let next = self.ids.len() as i64 + 1;
                *self.ids.entry(word.to_string()).or_insert(next)
            })
            .collect()
    }
}

fn batches(examples: &[JoinedExample], batch_size: usize, vocab: &mut Vocab) -> Vec<EvalBatch> {
    examples
        .chunks(batch_size)
        .map(|chunk| {
            let mut batch = EvalBatch::default();
            for example in chunk {
                let left = vocab.encode(&example.text_left);
                let right = vocab.encode(&example.text_right);
                let segments: Vec<i64> = left.iter().map(|_| 0).chain(right.iter().map(|_| 1)).collect();
                let ids: Vec<i64> = left.into_iter().chain(right).collect();
                batch.attention_mask.push(ids.iter().map(|_| 1).collect());
                batch.input_ids.push(ids);
                batch.token_type_ids.push(segments);
                batch.labels.push(usize::from(example.label));
            }
            batch
        })
        .collect()
}

/// Scores a pair by Jaccard overlap of its two segments.
struct OverlapModel {
    threshold: f32,
}

impl EvalModel for OverlapModel {
    fn forward(
        &mut self,
        inputs: &ModelInputs<'_>,
        _device: Device,
    ) -> Result<ModelOutput, PrepError> {
        let segments = inputs
            .token_type_ids
            .ok_or_else(|| PrepError::Configuration("segment ids required".to_string()))?;
        let mut logits = Vec::with_capacity(inputs.input_ids.len());
        let mut loss = 0.0;
        for ((ids, segs), &label) in inputs.input_ids.iter().zip(segments).zip(inputs.labels) {
            let side = |which: i64| -> HashSet<i64> {
                ids.iter()
                    .zip(segs)
                    .filter(|(_, seg)| **seg == which)
                    .map(|(id, _)| *id)
                    .collect()
            };
            let (left, right) = (side(0), side(1));
            let union = left.union(&right).count().max(1) as f32;
            let overlap = left.intersection(&right).count() as f32 / union;
            let score = overlap - self.threshold;
            logits.push(vec![-score, score]);
            let p_true = 1.0 / (1.0 + (-2.0 * if label == 1 { score } else { -score }).exp());
            loss -= p_true.ln();
        }
        let n = logits.len().max(1) as f32;
        Ok(ModelOutput {
            loss: vec![loss / n],
            logits,
        })
    }
}

fn write_dataset(data_root: &Path) {
    let dir = data_root.join("abt-buy");
    let catalogs = dir.join("record_descriptions");
    fs::create_dir_all(&catalogs).unwrap();
    let mut abt = String::from("subject_id,name,description,price\n");
    let mut buy = String::from("subject_id,name,description,price\n");
    let mut pairs = String::from("source_id,target_id,label\n");
    for i in 0..20 {
        abt.push_str(&format!("a{i},acme widget {i},steel frame,\n"));
        buy.push_str(&format!("b{i},ACME Widget {i},,\n"));
        pairs.push_str(&format!("a{i},b{i},1\n"));
        pairs.push_str(&format!("a{i},b{},0\n", (i + 1) % 20));
        pairs.push_str(&format!("a{i},b{},0\n", (i + 7) % 20));
    }
    fs::write(catalogs.join("1_abt.csv"), abt).unwrap();
    fs::write(catalogs.join("2_buy.csv"), buy).unwrap();
    fs::write(dir.join("feature_vector.csv"), pairs).unwrap();
}

#[test]
fn evaluates_prepared_splits_and_logs_both() {
    let temp = tempdir().unwrap();
    let data = temp.path().join("data");
    let out = temp.path().join("out");
    let models = temp.path().join("models");
    write_dataset(&data);

    let spec = find_dataset("abt-buy").unwrap();
    let summary = prepare_dataset(&spec, &PrepareConfig::new(&data, &out)).unwrap();
    assert_eq!(summary.ratio_cap, 2);

    let window = out.join("abt-buy-2-0");
    let mut vocab = Vocab::default();
    let mut model = OverlapModel { threshold: 0.5 };

    let dev = read_examples(window.join(SplitLabel::Validation.file_name())).unwrap();
    let dev_batches = batches(&dev, 4, &mut vocab);
    let validation = Evaluation::new(EvaluationConfig::new(
        "abt-buy-2-0",
        &models,
        EvalSplit::Validation,
    ));
    let outcome = validation
        .evaluate(&mut model, &dev_batches, Device::Cpu, 0, true)
        .unwrap();
    assert_eq!(outcome.result.simple_accuracy, 1.0);
    assert_eq!(outcome.result.f1_score, 1.0);
    assert!(outcome.result.eval_loss > 0.0);

    let test_rows = read_examples(window.join(SplitLabel::Test.file_name())).unwrap();
    let test_batches = batches(&test_rows, 4, &mut vocab);
    let test = Evaluation::new(EvaluationConfig::new("abt-buy-2-0", &models, EvalSplit::Test));
    test.evaluate(&mut model, &test_batches, Device::Cpu, 0, true)
        .unwrap();

    let log = fs::read_to_string(models.join("abt-buy-2-0/eval_results.txt")).unwrap();
    let validation_at = log.find("***** validation results after epoch 0 *****").unwrap();
    let test_at = log.find("***** test results after epoch 0 *****").unwrap();
    assert!(validation_at < test_at);
    assert_eq!(log.matches("simple_accuracy: 1.0").count(), 2);

    let snapshot = PredictionSnapshot::load(test.snapshot_path(0)).unwrap();
    assert_eq!(snapshot.split, "test");
    assert_eq!(snapshot.labels.len(), test_rows.len());
    assert_eq!(snapshot.predictions, snapshot.labels);
    for row in &snapshot.probabilities {
        assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn misses_are_reflected_in_f1_and_report() {
    let temp = tempdir().unwrap();
    let examples = vec![
        JoinedExample {
            idx: 0,
            text_left: "acme widget 1".to_string(),
            text_right: "acme widget 1".to_string(),
            label: 1,
        },
        JoinedExample {
            idx: 1,
            text_left: "acme widget 2".to_string(),
            text_right: "other brand".to_string(),
            label: 1,
        },
        JoinedExample {
            idx: 2,
            text_left: "acme widget 3".to_string(),
            text_right: "gizmo".to_string(),
            label: 0,
        },
    ];
    let path = temp.path().join("dev.tsv");
    write_examples(&path, &examples).unwrap();
    let examples = read_examples(&path).unwrap();

    let mut vocab = Vocab::default();
    let loader = batches(&examples, 2, &mut vocab);
    let evaluation = Evaluation::new(EvaluationConfig::new(
        "exp",
        temp.path(),
        EvalSplit::Validation,
    ));
    let mut model = OverlapModel { threshold: 0.5 };
    let outcome = evaluation
        .evaluate(&mut model, &loader, Device::Cpu, 3, false)
        .unwrap();
    // One true positive, one false negative, one true negative.
    assert!((outcome.result.simple_accuracy - 2.0 / 3.0).abs() < 1e-9);
    assert!((outcome.result.f1_score - 2.0 / 3.0).abs() < 1e-9);
    assert!(outcome.report.contains("macro avg"));
    assert!(!evaluation.snapshot_path(3).exists());
}
