//! 表单编辑会话。
//!
//! 字段以字符串保存，和用户输入一致；提交时才解析成 [`WorkloadDescriptor`]。
//! FLOPs 只在架构或参数量被编辑、且两者都非空时重新推导，
//! 用户手改过的 FLOPs 不会被其他字段的编辑覆盖。

use serde::{Deserialize, Serialize};

use crate::error::{DescriptorError, FormError};
use crate::estimator::FlopsCatalog;
use crate::types::{Framework, RecommendRequest, ResourceMetrics, TaskType, WorkloadDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    ModelArchitecture,
    Framework,
    TaskType,
    ModelSizeMb,
    ParametersMillions,
    FlopsBillions,
    BatchSize,
    LatencyRequirementMs,
    ThroughputRequirement,
    Concurrency,
}

impl FormField {
    fn name(&self) -> &'static str {
        match self {
            FormField::ModelArchitecture => "model_type",
            FormField::Framework => "framework",
            FormField::TaskType => "task_type",
            FormField::ModelSizeMb => "model_size_mb",
            FormField::ParametersMillions => "parameters_millions",
            FormField::FlopsBillions => "flops_billions",
            FormField::BatchSize => "batch_size",
            FormField::LatencyRequirementMs => "latency_requirement_ms",
            FormField::ThroughputRequirement => "throughput_requirement",
            FormField::Concurrency => "concurrency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    #[default]
    PreDeployment,
    PostDeployment,
}

/// 能否提交
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Ready,
    /// post-deployment 模式下还没有指标，不算错误
    AwaitingMetrics,
    Invalid(FormError),
}

#[derive(Debug, Clone)]
pub struct WorkloadForm<'c> {
    catalog: &'c FlopsCatalog,
    model_architecture: String,
    framework: String,
    task_type: String,
    model_size_mb: String,
    parameters_millions: String,
    flops_billions: String,
    batch_size: String,
    latency_requirement_ms: String,
    throughput_requirement: String,
    concurrency: String,
    mode: DeploymentMode,
    metrics: Option<ResourceMetrics>,
}

impl<'c> WorkloadForm<'c> {
    pub fn new(catalog: &'c FlopsCatalog) -> Self {
        Self {
            catalog,
            model_architecture: String::new(),
            framework: String::new(),
            task_type: String::new(),
            model_size_mb: String::new(),
            parameters_millions: String::new(),
            flops_billions: String::new(),
            batch_size: String::new(),
            latency_requirement_ms: String::new(),
            throughput_requirement: String::new(),
            concurrency: "1".to_string(),
            mode: DeploymentMode::default(),
            metrics: None,
        }
    }

    fn slot(&self, field: FormField) -> &String {
        match field {
            FormField::ModelArchitecture => &self.model_architecture,
            FormField::Framework => &self.framework,
            FormField::TaskType => &self.task_type,
            FormField::ModelSizeMb => &self.model_size_mb,
            FormField::ParametersMillions => &self.parameters_millions,
            FormField::FlopsBillions => &self.flops_billions,
            FormField::BatchSize => &self.batch_size,
            FormField::LatencyRequirementMs => &self.latency_requirement_ms,
            FormField::ThroughputRequirement => &self.throughput_requirement,
            FormField::Concurrency => &self.concurrency,
        }
    }

    fn slot_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::ModelArchitecture => &mut self.model_architecture,
            FormField::Framework => &mut self.framework,
            FormField::TaskType => &mut self.task_type,
            FormField::ModelSizeMb => &mut self.model_size_mb,
            FormField::ParametersMillions => &mut self.parameters_millions,
            FormField::FlopsBillions => &mut self.flops_billions,
            FormField::BatchSize => &mut self.batch_size,
            FormField::LatencyRequirementMs => &mut self.latency_requirement_ms,
            FormField::ThroughputRequirement => &mut self.throughput_requirement,
            FormField::Concurrency => &mut self.concurrency,
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        self.slot(field)
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// 编辑一个字段
    pub fn edit(&mut self, field: FormField, value: impl Into<String>) {
        *self.slot_mut(field) = value.into();

        if matches!(
            field,
            FormField::ModelArchitecture | FormField::ParametersMillions
        ) {
            self.rederive_flops();
        }
    }

    fn rederive_flops(&mut self) {
        if self.model_architecture.is_empty() || self.parameters_millions.is_empty() {
            return;
        }
        // 负数、非数字不估算，保留原值
        let Ok(params) = self.parameters_millions.trim().parse::<f64>() else {
            return;
        };
        if !params.is_finite() || params < 0.0 {
            return;
        }
        self.flops_billions = self.catalog.estimate(&self.model_architecture, params);
    }

    pub fn set_mode(&mut self, mode: DeploymentMode) {
        self.mode = mode;
    }

    /// 资源指标面板刷新或保存时调用
    pub fn set_metrics(&mut self, metrics: Option<ResourceMetrics>) {
        self.metrics = metrics;
    }

    fn required(&self, field: FormField) -> Result<&str, FormError> {
        let value = self.slot(field).trim();
        if value.is_empty() {
            Err(FormError::Missing { field: field.name() })
        } else {
            Ok(value)
        }
    }

    fn number(&self, field: FormField) -> Result<f64, FormError> {
        let raw = self.required(field)?;
        raw.parse::<f64>().map_err(|_| FormError::InvalidNumber {
            field: field.name(),
            value: raw.to_string(),
        })
    }

    fn integer(&self, field: FormField) -> Result<Option<u32>, FormError> {
        let raw = self.slot(field).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<u32>()
            .map(Some)
            .map_err(|_| FormError::InvalidNumber {
                field: field.name(),
                value: raw.to_string(),
            })
    }

    fn required_integer(&self, field: FormField) -> Result<u32, FormError> {
        self.integer(field)?
            .ok_or(FormError::Missing { field: field.name() })
    }

    /// 把当前编辑状态解析成不可变的请求描述
    pub fn descriptor(&self) -> Result<WorkloadDescriptor, FormError> {
        let model_type = self.required(FormField::ModelArchitecture)?.to_string();
        let framework_raw = self.required(FormField::Framework)?;
        let framework = Framework::parse(framework_raw).ok_or_else(|| FormError::UnknownOption {
            field: "framework",
            value: framework_raw.to_string(),
        })?;
        let task_raw = self.required(FormField::TaskType)?;
        let task_type = TaskType::parse(task_raw).ok_or_else(|| FormError::UnknownOption {
            field: "task_type",
            value: task_raw.to_string(),
        })?;

        let post = self.mode == DeploymentMode::PostDeployment;
        let request = RecommendRequest {
            model_type,
            framework,
            task_type,
            model_size_mb: self.number(FormField::ModelSizeMb)?,
            parameters_millions: self.number(FormField::ParametersMillions)?,
            flops_billions: self.number(FormField::FlopsBillions)?,
            batch_size: self.required_integer(FormField::BatchSize)?,
            latency_requirement_ms: self.integer(FormField::LatencyRequirementMs)?,
            throughput_requirement: self.integer(FormField::ThroughputRequirement)?,
            concurrency: self.integer(FormField::Concurrency)?.unwrap_or(1),
            is_post_deployment: post,
            // pre-deployment 下即使面板里有旧指标也不附带
            resource_metrics: if post { self.metrics } else { None },
        };

        Ok(WorkloadDescriptor::try_from(&request)?)
    }

    pub fn readiness(&self) -> Readiness {
        match self.descriptor() {
            Ok(_) => Readiness::Ready,
            Err(FormError::Descriptor(DescriptorError::AwaitingMetrics)) => {
                Readiness::AwaitingMetrics
            }
            Err(err) => Readiness::Invalid(err),
        }
    }
}
