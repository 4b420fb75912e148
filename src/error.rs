use ash::vk;
use std::{backtrace::BacktraceStatus, fmt::Display};

pub type SrResult<T> = std::result::Result<T, SrError>;

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug)]
pub enum ErrorSource {
    VULKAN(vk::Result),
    ALLOCATOR(gpu_allocator::AllocationError),
    CUSTOM,
}

#[derive(Debug)]
pub struct SrError {
    source: Option<ErrorSource>,
    description: String,
}

impl SrError {
    pub fn new(source: Option<ErrorSource>, description: String) -> Self {
        Self { source, description }
    }
    pub fn new_custom(description: String) -> Self {
        Self::new(Some(ErrorSource::CUSTOM), description)
    }
    pub fn from_vk_with_backtrace(vk_result: vk::Result, bt: std::backtrace::Backtrace) -> Self {
        let description = match vk_result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => String::from("out of device memory"),
            vk::Result::ERROR_DEVICE_LOST => String::from("device lost"),
            e => format!("UNEXPECTED VULKAN ERROR: {e}"),
        };
        let description = Self::with_backtrace(description, bt);

        SrError::new(Some(ErrorSource::VULKAN(vk_result)), description)
    }
    fn with_backtrace(description: String, bt: std::backtrace::Backtrace) -> String {
        if bt.status() == BacktraceStatus::Captured {
            format!("{description}\n{bt}")
        } else {
            format!("{description} (set RUST_BACKTRACE=1 to get a backtrace)")
        }
    }
    pub fn get_source(&self) -> Option<&ErrorSource> {
        self.source.as_ref()
    }
}

impl From<vk::Result> for SrError {
    fn from(value: vk::Result) -> Self {
        Self::from_vk_with_backtrace(value, std::backtrace::Backtrace::capture())
    }
}

impl From<gpu_allocator::AllocationError> for SrError {
    fn from(value: gpu_allocator::AllocationError) -> Self {
        let description =
            Self::with_backtrace(format!("GPU ALLOCATOR ERROR: {value}"), std::backtrace::Backtrace::capture());
        Self::new(Some(ErrorSource::ALLOCATOR(value)), description)
    }
}

impl Display for SrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.description.fmt(f)
    }
}

impl std::error::Error for SrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(ErrorSource::VULKAN(src)) => Some(src),
            Some(ErrorSource::ALLOCATOR(src)) => Some(src),
            _ => None,
        }
    }
}
