//! Scripted engine for tests and model-free development

use tensor_ops::{TensorData, TensorSpec};
use tracing::debug;

use crate::engine::InferenceEngine;
use crate::InferenceError;

/// Engine that returns a fixed output buffer for every invocation
#[derive(Debug, Clone)]
pub struct MockEngine {
    input: TensorSpec,
    output: TensorSpec,
    scores: TensorData,
    fail_allocate: bool,
    fail_invoke: bool,
    allocated: bool,
    invoked: bool,
    pending_input: Option<TensorData>,
    last_input: Option<TensorData>,
    invocations: usize,
}

impl MockEngine {
    /// Create a mock with the given slot descriptors and scripted scores
    pub fn new(input: TensorSpec, output: TensorSpec, scores: TensorData) -> Self {
        Self {
            input,
            output,
            scores,
            fail_allocate: false,
            fail_invoke: false,
            allocated: false,
            invoked: false,
            pending_input: None,
            last_input: None,
            invocations: 0,
        }
    }

    /// Make every `allocate` call fail
    pub fn failing_allocation(mut self) -> Self {
        self.fail_allocate = true;
        self
    }

    /// Make every `invoke` call fail
    pub fn failing_invocation(mut self) -> Self {
        self.fail_invoke = true;
        self
    }

    /// Input buffer of the most recent invocation
    pub fn last_input(&self) -> Option<&TensorData> {
        self.last_input.as_ref()
    }

    /// Number of successful invocations
    pub fn invocations(&self) -> usize {
        self.invocations
    }
}

impl InferenceEngine for MockEngine {
    fn describe_input(&self) -> Result<TensorSpec, InferenceError> {
        Ok(self.input.clone())
    }

    fn describe_output(&self) -> Result<TensorSpec, InferenceError> {
        Ok(self.output.clone())
    }

    fn allocate(&mut self) -> Result<(), InferenceError> {
        if self.fail_allocate {
            return Err(InferenceError::Allocation("mock allocation failure".to_string()));
        }
        self.allocated = true;
        self.invoked = false;
        self.pending_input = None;
        Ok(())
    }

    fn write_input(&mut self, data: TensorData) -> Result<(), InferenceError> {
        if !self.allocated {
            return Err(InferenceError::Allocation("tensors not allocated".to_string()));
        }
        if data.len() != self.input.element_count() {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{:?}", self.input.dims),
                actual: format!("{} elements", data.len()),
            });
        }
        self.pending_input = Some(data);
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), InferenceError> {
        if self.fail_invoke {
            return Err(InferenceError::Invocation("mock invocation failure".to_string()));
        }
        let input = self
            .pending_input
            .take()
            .ok_or_else(|| InferenceError::Invocation("no input written".to_string()))?;
        debug!("Mock invocation #{}", self.invocations + 1);
        self.last_input = Some(input);
        self.invoked = true;
        self.invocations += 1;
        Ok(())
    }

    fn read_output(&self) -> Result<&TensorData, InferenceError> {
        if !self.invoked {
            return Err(InferenceError::Invocation("engine has not been invoked".to_string()));
        }
        Ok(&self.scores)
    }
}
