//! Sentiment classifiers trained on the heuristically labeled table.
//!
//! Two classifier families sit behind the [`Classifier`] trait: multinomial
//! logistic regression fitted by full-batch gradient descent on candle
//! tensors, and multinomial naive Bayes. [`SentimentTrainer`] splits the
//! table, fits every configured classifier and scores it on the held-out
//! rows.

use crate::config::{ClassifierKind, TrainerConfig};
use crate::error::{AnalysisError, AnalysisResult};
use crate::features::{BagOfWords, FeatureMatrix};
use crate::sentiment::{agreement_rate, SentimentLabeler};
use crate::stats::TrainingRow;
use candle_core::{DType, Device, Tensor};
use chatpulse_core::{Error, Sentiment};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const N_CLASSES: usize = 3;

/// Class probabilities for one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPrediction {
    /// Most probable class.
    pub sentiment: Sentiment,

    /// Probability of that class (0.0 to 1.0).
    pub confidence: f64,

    /// Probabilities in [`Sentiment::ALL`] order.
    pub probabilities: [f64; N_CLASSES],
}

impl SentimentPrediction {
    fn from_probabilities(probabilities: [f64; N_CLASSES]) -> Self {
        let mut best = 0;
        for (idx, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = idx;
            }
        }
        Self {
            sentiment: Sentiment::ALL[best],
            confidence: probabilities[best],
            probabilities,
        }
    }
}

/// A fitted classifier over bag-of-words rows.
pub trait Classifier: Send + Sync {
    /// Which family this is.
    fn kind(&self) -> ClassifierKind;

    /// Class probabilities per row.
    fn predict_proba(&self, x: &FeatureMatrix) -> AnalysisResult<Vec<SentimentPrediction>>;

    /// Most probable class per row.
    fn predict(&self, x: &FeatureMatrix) -> AnalysisResult<Vec<Sentiment>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| p.sentiment)
            .collect())
    }
}

/// Fit a classifier of the given family.
pub fn fit_classifier(
    kind: ClassifierKind,
    config: &TrainerConfig,
    x: &FeatureMatrix,
    y: &[Sentiment],
) -> AnalysisResult<Box<dyn Classifier>> {
    if x.n_rows() != y.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "{} feature rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    Ok(match kind {
        ClassifierKind::Logistic => Box::new(LogisticRegression::fit(config, x, y)?),
        ClassifierKind::NaiveBayes => Box::new(NaiveBayes::fit(config.smoothing, x, y)),
    })
}

/// Multinomial logistic regression with L2 penalty.
pub struct LogisticRegression {
    device: Device,
    weights: Tensor,
    bias: Tensor,
}

impl LogisticRegression {
    /// Minimize mean cross-entropy plus `|W|^2 / (2 C n)` by gradient descent.
    pub fn fit(config: &TrainerConfig, x: &FeatureMatrix, y: &[Sentiment]) -> AnalysisResult<Self> {
        let device = device::best_available_device();
        let (n, d) = (x.n_rows(), x.n_features());

        let features = Tensor::from_vec(x.to_dense(), (n, d), &device)?;
        let features_t = features.t()?.contiguous()?;
        let targets = one_hot(y, &device)?;

        let mut weights = Tensor::zeros((d, N_CLASSES), DType::F32, &device)?;
        let mut bias = Tensor::zeros((1, N_CLASSES), DType::F32, &device)?;
        let inv_n = 1.0 / n as f64;
        let penalty = 1.0 / (config.inverse_regularization * n as f64);

        for epoch in 0..config.epochs {
            let logits = features.matmul(&weights)?.broadcast_add(&bias)?;
            let residual = softmax_rows(&logits)?.sub(&targets)?;

            let grad_w = features_t
                .matmul(&residual)?
                .affine(inv_n, 0.0)?
                .add(&weights.affine(penalty, 0.0)?)?;
            let grad_b = residual.sum_keepdim(0)?.affine(inv_n, 0.0)?;

            weights = weights.sub(&grad_w.affine(config.learning_rate, 0.0)?)?;
            bias = bias.sub(&grad_b.affine(config.learning_rate, 0.0)?)?;

            if epoch % 100 == 0 {
                debug!("logistic regression epoch {}/{}", epoch, config.epochs);
            }
        }

        Ok(Self {
            device,
            weights,
            bias,
        })
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Logistic
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> AnalysisResult<Vec<SentimentPrediction>> {
        if x.n_rows() == 0 {
            return Ok(Vec::new());
        }
        let features = Tensor::from_vec(x.to_dense(), (x.n_rows(), x.n_features()), &self.device)?;
        let logits = features.matmul(&self.weights)?.broadcast_add(&self.bias)?;
        let probs = softmax_rows(&logits)?.to_vec2::<f32>()?;

        Ok(probs
            .into_iter()
            .map(|row| {
                let mut p = [0.0; N_CLASSES];
                for (slot, v) in p.iter_mut().zip(row) {
                    *slot = f64::from(v);
                }
                SentimentPrediction::from_probabilities(p)
            })
            .collect())
    }
}

fn one_hot(y: &[Sentiment], device: &Device) -> AnalysisResult<Tensor> {
    let mut data = vec![0.0f32; y.len() * N_CLASSES];
    for (row, label) in y.iter().enumerate() {
        data[row * N_CLASSES + label.index()] = 1.0;
    }
    Ok(Tensor::from_vec(data, (y.len(), N_CLASSES), device)?)
}

fn softmax_rows(logits: &Tensor) -> AnalysisResult<Tensor> {
    let max = logits.max_keepdim(1)?;
    let exp = logits.broadcast_sub(&max)?.exp()?;
    let sum = exp.sum_keepdim(1)?;
    Ok(exp.broadcast_div(&sum)?)
}

/// Multinomial naive Bayes with additive smoothing.
#[derive(Debug, Clone)]
pub struct NaiveBayes {
    class_log_prior: [f64; N_CLASSES],
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayes {
    /// Count term occurrences per class. Classes absent from `y` get a
    /// prior of zero and are never predicted.
    pub fn fit(alpha: f64, x: &FeatureMatrix, y: &[Sentiment]) -> Self {
        let d = x.n_features();
        let mut class_count = [0usize; N_CLASSES];
        let mut feature_count = vec![vec![0.0f64; d]; N_CLASSES];

        for (row, label) in x.rows().zip(y) {
            let k = label.index();
            class_count[k] += 1;
            for &(j, v) in row {
                feature_count[k][j] += f64::from(v);
            }
        }

        let n = y.len() as f64;
        let mut class_log_prior = [f64::NEG_INFINITY; N_CLASSES];
        for (k, count) in class_count.iter().enumerate() {
            if *count > 0 {
                class_log_prior[k] = (*count as f64 / n).ln();
            }
        }

        let feature_log_prob = feature_count
            .into_iter()
            .map(|counts| {
                let total: f64 = counts.iter().sum::<f64>() + alpha * d as f64;
                counts.into_iter().map(|c| ((c + alpha) / total).ln()).collect()
            })
            .collect();

        Self {
            class_log_prior,
            feature_log_prob,
        }
    }

    fn joint_log_likelihood(&self, row: &[(usize, f32)]) -> [f64; N_CLASSES] {
        let mut joint = self.class_log_prior;
        for (k, score) in joint.iter_mut().enumerate() {
            if score.is_finite() {
                *score += row
                    .iter()
                    .map(|&(j, v)| f64::from(v) * self.feature_log_prob[k][j])
                    .sum::<f64>();
            }
        }
        joint
    }
}

impl Classifier for NaiveBayes {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::NaiveBayes
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> AnalysisResult<Vec<SentimentPrediction>> {
        Ok(x.rows()
            .map(|row| {
                let joint = self.joint_log_likelihood(row);
                let max = joint.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let mut p = joint.map(|s| (s - max).exp());
                let sum: f64 = p.iter().sum();
                for v in &mut p {
                    *v /= sum;
                }
                SentimentPrediction::from_probabilities(p)
            })
            .collect())
    }
}

/// A vectorizer and classifier that label raw message text.
pub struct TrainedModel {
    vectorizer: BagOfWords,
    classifier: Box<dyn Classifier>,
}

impl TrainedModel {
    /// Pair a fitted vectorizer with a classifier trained on its output.
    pub fn new(vectorizer: BagOfWords, classifier: Box<dyn Classifier>) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }

    /// Classifier family.
    pub fn kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }

    /// Class probabilities of one text.
    pub fn predict(&self, text: &str) -> AnalysisResult<SentimentPrediction> {
        let x = self.vectorizer.transform(&[text]);
        self.classifier
            .predict_proba(&x)?
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::Model("classifier returned no prediction".to_string()))
    }
}

impl SentimentLabeler for TrainedModel {
    fn name(&self) -> &str {
        self.classifier.kind().name()
    }

    fn label(&self, text: &str) -> AnalysisResult<Sentiment> {
        Ok(self.predict(text)?.sentiment)
    }

    fn label_all(&self, texts: &[String]) -> AnalysisResult<Vec<Sentiment>> {
        let x = self.vectorizer.transform(texts);
        self.classifier.predict(&x)
    }
}

/// Precision, recall and F1 of one class on the held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class the row describes.
    pub sentiment: Sentiment,
    /// Correct predictions over all predictions of this class.
    pub precision: f64,
    /// Correct predictions over all true rows of this class.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// True rows of this class.
    pub support: usize,
}

/// Averaged precision, recall and F1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AverageMetrics {
    /// Mean precision.
    pub precision: f64,
    /// Mean recall.
    pub recall: f64,
    /// Mean F1.
    pub f1: f64,
}

/// Held-out evaluation of one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Share of held-out rows predicted correctly.
    pub accuracy: f64,
    /// Classes seen in either truth or prediction, in [`Sentiment::ALL`] order.
    pub classes: Vec<ClassMetrics>,
    /// Unweighted mean over `classes`.
    pub macro_avg: AverageMetrics,
    /// Mean over `classes` weighted by support.
    pub weighted_avg: AverageMetrics,
    /// Held-out rows.
    pub support: usize,
}

/// Score predictions against the truth. Undefined ratios count as 0.0.
pub fn evaluate(truth: &[Sentiment], predicted: &[Sentiment]) -> ClassificationReport {
    let mut tp = [0usize; N_CLASSES];
    let mut actual = [0usize; N_CLASSES];
    let mut guessed = [0usize; N_CLASSES];
    for (t, p) in truth.iter().zip(predicted) {
        actual[t.index()] += 1;
        guessed[p.index()] += 1;
        if t == p {
            tp[t.index()] += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let classes: Vec<ClassMetrics> = Sentiment::ALL
        .iter()
        .filter(|s| actual[s.index()] + guessed[s.index()] > 0)
        .map(|&sentiment| {
            let k = sentiment.index();
            let precision = ratio(tp[k], guessed[k]);
            let recall = ratio(tp[k], actual[k]);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                sentiment,
                precision,
                recall,
                f1,
                support: actual[k],
            }
        })
        .collect();

    let support: usize = actual.iter().sum();
    let mut macro_avg = AverageMetrics::default();
    let mut weighted_avg = AverageMetrics::default();
    for class in &classes {
        let w = class.support as f64;
        macro_avg.precision += class.precision;
        macro_avg.recall += class.recall;
        macro_avg.f1 += class.f1;
        weighted_avg.precision += class.precision * w;
        weighted_avg.recall += class.recall * w;
        weighted_avg.f1 += class.f1 * w;
    }
    if !classes.is_empty() {
        let k = classes.len() as f64;
        macro_avg = AverageMetrics {
            precision: macro_avg.precision / k,
            recall: macro_avg.recall / k,
            f1: macro_avg.f1 / k,
        };
    }
    if support > 0 {
        let n = support as f64;
        weighted_avg = AverageMetrics {
            precision: weighted_avg.precision / n,
            recall: weighted_avg.recall / n,
            f1: weighted_avg.f1 / n,
        };
    }

    ClassificationReport {
        accuracy: ratio(tp.iter().sum(), support),
        classes,
        macro_avg,
        weighted_avg,
        support,
    }
}

/// Shuffle `0..n` with a seeded generator and hold out `ceil(test_size * n)`
/// indices. Returns `(train, test)`.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = fastrand::Rng::with_seed(seed);
    rng.shuffle(&mut indices);

    // 0.2 * 30 is 6.000000000000001 in binary floating point
    let n_test = ((n as f64 * test_size) - 1e-9).ceil().max(0.0) as usize;
    let n_test = n_test.min(n);
    let train = indices.split_off(n_test);
    (train, indices)
}

/// Scores of one fitted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    /// Classifier name, e.g. `naive-bayes`.
    pub classifier: String,
    /// Held-out scores.
    pub report: ClassificationReport,
    /// Share of table messages where the classifier and the reference
    /// labeler agree.
    pub reference_agreement: f64,
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Rows in the training table.
    pub rows: usize,
    /// Rows the classifiers were fitted on.
    pub train_rows: usize,
    /// Held-out rows.
    pub test_rows: usize,
    /// Terms learned from the training rows.
    pub vocabulary: usize,
    /// Name of the labeler used for agreement scores.
    pub reference: String,
    /// One entry per configured classifier.
    pub results: Vec<ClassifierResult>,
}

/// A training summary and the models behind it.
pub struct TrainingRun {
    /// Scores.
    pub summary: TrainingSummary,
    /// Fitted models, in the order of `summary.results`.
    pub models: Vec<TrainedModel>,
}

/// Fits and evaluates the configured classifiers on a training table.
#[derive(Debug, Clone, Default)]
pub struct SentimentTrainer {
    config: TrainerConfig,
}

impl SentimentTrainer {
    /// Create a trainer.
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Trainer configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Split, vectorize, fit and evaluate.
    ///
    /// Fails with insufficient data when the table is empty, has a single
    /// class, or its training partition has a single class.
    pub fn train(
        &self,
        rows: &[TrainingRow],
        reference: &dyn SentimentLabeler,
    ) -> AnalysisResult<TrainingRun> {
        if rows.is_empty() {
            return Err(Error::insufficient_data("training table is empty").into());
        }
        let labels: Vec<Sentiment> = rows.iter().map(|r| r.sentiment).collect();
        if distinct_classes(&labels) < 2 {
            return Err(Error::insufficient_data(format!(
                "training table has a single class ({})",
                labels[0]
            ))
            .into());
        }

        let (train_idx, test_idx) = train_test_split(rows.len(), self.config.test_size, self.config.seed);
        let y_train: Vec<Sentiment> = train_idx.iter().map(|&i| labels[i]).collect();
        if distinct_classes(&y_train) < 2 {
            return Err(Error::insufficient_data(format!(
                "training partition of {} rows has fewer than two classes",
                train_idx.len()
            ))
            .into());
        }
        let y_test: Vec<Sentiment> = test_idx.iter().map(|&i| labels[i]).collect();

        let train_texts: Vec<&str> = train_idx.iter().map(|&i| rows[i].message.as_str()).collect();
        let test_texts: Vec<&str> = test_idx.iter().map(|&i| rows[i].message.as_str()).collect();

        let mut vectorizer = BagOfWords::new().with_max_features(self.config.max_features);
        let x_train = vectorizer.fit_transform(&train_texts);
        if vectorizer.n_terms() == 0 {
            return Err(
                Error::insufficient_data("training partition has no vocabulary terms").into(),
            );
        }
        let x_test = vectorizer.transform(&test_texts);
        info!(
            "Training on {} rows, evaluating on {}, vocabulary {}",
            train_idx.len(),
            test_idx.len(),
            vectorizer.n_terms()
        );

        let messages: Vec<String> = rows.iter().map(|r| r.message.clone()).collect();
        let reference_labels = reference.label_all(&messages)?;

        let mut results = Vec::with_capacity(self.config.classifiers.len());
        let mut models = Vec::with_capacity(self.config.classifiers.len());
        for &kind in &self.config.classifiers {
            let classifier = fit_classifier(kind, &self.config, &x_train, &y_train)?;
            let report = evaluate(&y_test, &classifier.predict(&x_test)?);
            let model = TrainedModel::new(vectorizer.clone(), classifier);
            let reference_agreement = agreement_rate(&model.label_all(&messages)?, &reference_labels);

            info!(
                "{}: accuracy {:.3}, agreement with {} {:.3}",
                kind.name(),
                report.accuracy,
                reference.name(),
                reference_agreement
            );
            results.push(ClassifierResult {
                classifier: kind.name().to_string(),
                report,
                reference_agreement,
            });
            models.push(model);
        }

        Ok(TrainingRun {
            summary: TrainingSummary {
                rows: rows.len(),
                train_rows: train_idx.len(),
                test_rows: test_idx.len(),
                vocabulary: vectorizer.n_terms(),
                reference: reference.name().to_string(),
                results,
            },
            models,
        })
    }
}

fn distinct_classes(labels: &[Sentiment]) -> usize {
    let mut seen = [false; N_CLASSES];
    for label in labels {
        seen[label.index()] = true;
    }
    seen.iter().filter(|s| **s).count()
}

/// Compute device selection.
pub mod device {
    use candle_core::Device;

    /// Metal when built with the `metal` feature and a GPU is present,
    /// otherwise the CPU.
    pub fn best_available_device() -> Device {
        #[cfg(feature = "metal")]
        {
            if let Ok(device) = Device::new_metal(0) {
                return device;
            }
        }
        Device::Cpu
    }
}
