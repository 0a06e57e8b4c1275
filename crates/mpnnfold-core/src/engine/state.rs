use crate::core::models::prediction::{BestMetric, PredictionResult};

/// The prediction currently holding the best value of the selection metric.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPrediction {
    pub design_index: usize,
    pub result: PredictionResult,
}

/// Running selection over a sequence of predictions.
///
/// A candidate replaces the incumbent only if it is strictly better under the metric's
/// direction, so ties keep the earliest design.
#[derive(Debug, Clone)]
pub struct BestTracker {
    metric: BestMetric,
    best: Option<BestPrediction>,
    offered: usize,
}

impl BestTracker {
    pub fn new(metric: BestMetric) -> Self {
        Self {
            metric,
            best: None,
            offered: 0,
        }
    }

    pub fn metric(&self) -> BestMetric {
        self.metric
    }

    /// Considers one prediction and returns `true` if it became the new best.
    pub fn offer(&mut self, design_index: usize, result: &PredictionResult) -> bool {
        self.offered += 1;
        let improves = match &self.best {
            None => true,
            Some(current) => self
                .metric
                .improves(result.best_metric_value, current.result.best_metric_value),
        };
        if improves {
            self.best = Some(BestPrediction {
                design_index,
                result: result.clone(),
            });
        }
        improves
    }

    pub fn offered(&self) -> usize {
        self.offered
    }

    pub fn into_best(self) -> Option<BestPrediction> {
        self.best
    }
}
