//! ONNX Runtime inference for class probabilities. Input: [1, n_features] f32,
//! output: a float probabilities tensor (classifier exported without ZipMap).

use crate::error::{Result, ScreeningError};
use ndarray::{Array2, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};

static ORT_ENV: OnceLock<Arc<Environment>> = OnceLock::new();

fn init_env() -> Result<Arc<Environment>> {
    if let Some(env) = ORT_ENV.get() {
        return Ok(env.clone());
    }
    let env = Environment::builder()
        .with_name("dyslexia-screen")
        .build()?
        .into_arc();
    Ok(ORT_ENV.get_or_init(|| env).clone())
}

pub struct OnnxClassifier {
    session: Session,
    /// Output index carrying probabilities
    proba_output: usize,
    /// Width of the input tensor when the graph declares it
    input_dim: Option<usize>,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScreeningError::ModelUnavailable(format!(
                "ONNX model not found: {}",
                path.display()
            )));
        }
        let env = init_env()?;
        let session = SessionBuilder::new(&env)?
            .with_optimization_level(GraphOptimizationLevel::Level1)?
            .with_model_from_file(path)?;

        let input_dim = session
            .inputs
            .first()
            .and_then(|i| i.dimensions.last().copied().flatten())
            .map(|d| d as usize);
        let proba_output = session
            .outputs
            .iter()
            .position(|o| o.name.to_ascii_lowercase().contains("prob"))
            .unwrap_or_else(|| session.outputs.len().saturating_sub(1));

        tracing::info!(
            path = %path.display(),
            input_dim = ?input_dim,
            proba_output,
            "ONNX classifier loaded"
        );
        Ok(Self {
            session,
            proba_output,
            input_dim,
        })
    }

    pub fn input_dim(&self) -> Option<usize> {
        self.input_dim
    }

    /// Run inference and return `[P(class0), P(class1)]`.
    pub fn predict(&self, values: &[f64]) -> Result<[f64; 2]> {
        let data: Vec<f32> = values.iter().map(|v| *v as f32).collect();
        let arr = Array2::from_shape_vec((1, data.len()), data)
            .map_err(|e| ScreeningError::ModelUnavailable(e.to_string()))?;
        let arr = CowArray::from(arr.into_dyn());
        let input = Value::from_array(self.session.allocator(), &arr)?;
        let outputs = self.session.run(vec![input])?;

        let out = outputs.get(self.proba_output).ok_or_else(|| {
            ScreeningError::ModelUnavailable("classifier produced no probability output".into())
        })?;
        let tensor = out.try_extract::<f32>()?;
        let probs: Vec<f64> = tensor.view().iter().map(|p| *p as f64).collect();
        match probs.as_slice() {
            [p0, p1] => Ok([*p0, *p1]),
            [p1] => Ok([1.0 - p1, *p1]),
            other => Err(ScreeningError::ModelUnavailable(format!(
                "expected 2 class probabilities, got {}",
                other.len()
            ))),
        }
    }
}
