//! Inference engine contract and its ONNX Runtime implementation

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use tensor_ops::{ElementType, TensorData, TensorSpec};
use tracing::{debug, error, info, warn};

use crate::{InferenceError, LoadError, SessionConfig};

/// Narrow contract the session drives an engine through.
///
/// Tensor buffers belong to the engine; callers only borrow them for the
/// duration of a call.
pub trait InferenceEngine {
    /// Shape and datatype the input slot requires
    fn describe_input(&self) -> Result<TensorSpec, InferenceError>;

    /// Shape and datatype of the output slot; the produced shape once invoked
    fn describe_output(&self) -> Result<TensorSpec, InferenceError>;

    /// Prepare tensors for the next invocation, discarding previous buffers
    fn allocate(&mut self) -> Result<(), InferenceError>;

    /// Place the input buffer in the input slot
    fn write_input(&mut self, data: TensorData) -> Result<(), InferenceError>;

    /// Run one forward pass
    fn invoke(&mut self) -> Result<(), InferenceError>;

    /// Borrow the output buffer of the last invocation
    fn read_output(&self) -> Result<&TensorData, InferenceError>;
}

/// ONNX Runtime backed engine
pub struct OrtEngine {
    session: Session,
    input_dims: Vec<i64>,
    input_type: ElementType,
    output_dims: Vec<i64>,
    output_type: ElementType,
    /// Resolved input shape, set by `allocate`
    input_shape: Option<Vec<usize>>,
    pending_input: Option<TensorData>,
    output: Option<(Vec<usize>, TensorData)>,
}

impl OrtEngine {
    /// Load a model and build its ONNX Runtime session
    pub fn load(model_path: impl AsRef<Path>, config: &SessionConfig) -> Result<Self, LoadError> {
        let path = model_path.as_ref();
        let model_error = |reason: String| LoadError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        info!("Loading classification model from {}", path.display());
        std::fs::metadata(path).map_err(|e| {
            error!("Failed to read model {}: {}", path.display(), e);
            model_error(e.to_string())
        })?;

        let builder = Session::builder()
            .and_then(|b| b.with_optimization_level(optimization_level(config.optimization_level)))
            .and_then(|b| b.with_intra_threads(config.intra_threads))
            .map_err(|e| {
                error!("Failed to construct interpreter: {}", e);
                LoadError::InterpreterBuild(e.to_string())
            })?;

        let session = builder.commit_from_file(path).map_err(|e| {
            error!("Failed to load model {}: {}", path.display(), e);
            model_error(e.to_string())
        })?;

        if session.inputs.len() != 1 || session.outputs.len() != 1 {
            return Err(LoadError::InterpreterBuild(format!(
                "expected exactly one input and one output, model has {} and {}",
                session.inputs.len(),
                session.outputs.len()
            )));
        }

        let (input_type, input_dims) = tensor_descriptor(&session.inputs[0].input_type)
            .ok_or_else(|| LoadError::InterpreterBuild("model input is not a tensor".to_string()))?;
        let (output_type, output_dims) = tensor_descriptor(&session.outputs[0].output_type)
            .ok_or_else(|| LoadError::InterpreterBuild("model output is not a tensor".to_string()))?;

        info!(
            "Model loaded: input {} {:?}, output {} {:?}, {} threads",
            input_type, input_dims, output_type, output_dims, config.intra_threads
        );

        Ok(Self {
            session,
            input_dims,
            input_type,
            output_dims,
            output_type,
            input_shape: None,
            pending_input: None,
            output: None,
        })
    }

    fn run(&self, input: TensorData, shape: &[usize]) -> Result<(Vec<usize>, TensorData), InferenceError> {
        let value = match input {
            TensorData::F32(v) => to_value(shape, v),
            TensorData::I8(v) => to_value(shape, v),
            TensorData::U8(v) => to_value(shape, v),
        }?;

        let inputs = ort::inputs![value].map_err(|e| InferenceError::Invocation(e.to_string()))?;
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| InferenceError::Invocation(e.to_string()))?;

        extract_output(&outputs[0], &self.output_type)
    }
}

impl InferenceEngine for OrtEngine {
    fn describe_input(&self) -> Result<TensorSpec, InferenceError> {
        Ok(TensorSpec::new(resolve_dims(&self.input_dims)?, self.input_type.clone()))
    }

    fn describe_output(&self) -> Result<TensorSpec, InferenceError> {
        if let Some((dims, _)) = &self.output {
            return Ok(TensorSpec::new(dims.clone(), self.output_type.clone()));
        }
        Ok(TensorSpec::new(resolve_dims(&self.output_dims)?, self.output_type.clone()))
    }

    fn allocate(&mut self) -> Result<(), InferenceError> {
        self.pending_input = None;
        self.output = None;
        let shape = resolve_dims(&self.input_dims)
            .map_err(|e| InferenceError::Allocation(e.to_string()))?;
        self.input_shape = Some(shape);
        Ok(())
    }

    fn write_input(&mut self, data: TensorData) -> Result<(), InferenceError> {
        let shape = self
            .input_shape
            .as_ref()
            .ok_or_else(|| InferenceError::Allocation("tensors not allocated".to_string()))?;

        if data.element_type() != self.input_type {
            return Err(InferenceError::UnsupportedDtype(format!(
                "input slot is {}, buffer is {}",
                self.input_type,
                data.element_type()
            )));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{:?} ({} elements)", shape, expected),
                actual: format!("{} elements", data.len()),
            });
        }

        self.pending_input = Some(data);
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), InferenceError> {
        let input = self
            .pending_input
            .take()
            .ok_or_else(|| InferenceError::Invocation("no input written".to_string()))?;
        let shape = self
            .input_shape
            .clone()
            .ok_or_else(|| InferenceError::Allocation("tensors not allocated".to_string()))?;

        let start = std::time::Instant::now();
        let output = self.run(input, &shape)?;
        debug!("Inference completed in {}ms", start.elapsed().as_millis());

        self.output = Some(output);
        Ok(())
    }

    fn read_output(&self) -> Result<&TensorData, InferenceError> {
        self.output
            .as_ref()
            .map(|(_, data)| data)
            .ok_or_else(|| InferenceError::Invocation("engine has not been invoked".to_string()))
    }
}

fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn element_type(ty: TensorElementType) -> ElementType {
    match ty {
        TensorElementType::Float32 => ElementType::F32,
        TensorElementType::Int8 => ElementType::I8,
        TensorElementType::Uint8 => ElementType::U8,
        other => ElementType::Unsupported(format!("{:?}", other).to_lowercase()),
    }
}

fn tensor_descriptor(value_type: &ValueType) -> Option<(ElementType, Vec<i64>)> {
    match value_type {
        ValueType::Tensor { ty, dimensions, .. } => Some((element_type(*ty), dimensions.clone())),
        _ => None,
    }
}

/// Replace a dynamic batch dimension with 1; other dynamic dims are an error
fn resolve_dims(dims: &[i64]) -> Result<Vec<usize>, InferenceError> {
    dims.iter()
        .enumerate()
        .map(|(axis, &d)| match (axis, d) {
            (_, d) if d > 0 => Ok(d as usize),
            (0, _) => Ok(1),
            _ => Err(InferenceError::InvalidInputShape {
                expected: "static extents after the batch axis".to_string(),
                actual: format!("{:?}", dims),
            }),
        })
        .collect()
}

fn to_value<T>(shape: &[usize], data: Vec<T>) -> Result<DynValue, InferenceError>
where
    T: ort::tensor::PrimitiveTensorElementType + std::fmt::Debug + Clone + 'static,
{
    let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|e| InferenceError::InvalidInputShape {
        expected: format!("{:?}", shape),
        actual: e.to_string(),
    })?;
    Tensor::from_array(array)
        .map(|t| t.into_dyn())
        .map_err(|e| InferenceError::Allocation(e.to_string()))
}

fn extract_output(
    output: &DynValue,
    output_type: &ElementType,
) -> Result<(Vec<usize>, TensorData), InferenceError> {
    let invocation = |e: ort::Error| InferenceError::Invocation(e.to_string());

    Ok(match output_type {
        ElementType::F32 => {
            let view = output.try_extract_tensor::<f32>().map_err(invocation)?;
            (view.shape().to_vec(), TensorData::F32(view.iter().copied().collect()))
        }
        ElementType::I8 => {
            let view = output.try_extract_tensor::<i8>().map_err(invocation)?;
            (view.shape().to_vec(), TensorData::I8(view.iter().copied().collect()))
        }
        ElementType::U8 => {
            let view = output.try_extract_tensor::<u8>().map_err(invocation)?;
            (view.shape().to_vec(), TensorData::U8(view.iter().copied().collect()))
        }
        ElementType::Unsupported(name) => {
            warn!("Cannot handle output type {}", name);
            return Err(InferenceError::UnsupportedDtype(name.clone()));
        }
    })
}
