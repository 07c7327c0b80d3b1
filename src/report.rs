//! 结果导出：JSON、CSV、分页文本和 PDF。都是纯格式转换。

use chrono::{DateTime, Utc};
use genpdf::elements::{Break, PageBreak, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::{Document, SimplePageDecorator};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ReportError;
use crate::hardware::{HardwareCatalog, HardwareSpec};
use crate::types::{RecommendationResult, SimulationEntry, WorkloadDescriptor};

/// 每页正文行数，不含页脚
pub const LINES_PER_PAGE: usize = 40;

const FOOTER_BRAND: &str = "Generated by AI Workload Optimizer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Text,
    Pdf,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "txt" | "text" => Some(ReportFormat::Text),
            "pdf" => Some(ReportFormat::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Text => "txt",
            ReportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    pub model_type: String,
    pub framework: String,
    pub task_type: String,
    #[serde(rename = "modelSizeMB")]
    pub model_size_mb: f64,
    pub parameters_millions: f64,
    pub flops_billions: f64,
    pub batch_size: u32,
    pub latency_requirement: Option<u32>,
    pub throughput_requirement: Option<u32>,
    pub concurrency: u32,
    pub deployment_mode: &'static str,
}

impl From<&WorkloadDescriptor> for ModelConfiguration {
    fn from(d: &WorkloadDescriptor) -> Self {
        Self {
            model_type: d.model_architecture.clone(),
            framework: d.framework.as_str().to_string(),
            task_type: d.task_type.as_str().to_string(),
            model_size_mb: d.model_size_mb,
            parameters_millions: d.parameters_millions,
            flops_billions: d.flops_billions,
            batch_size: d.batch_size,
            latency_requirement: d.latency_requirement_ms,
            throughput_requirement: d.throughput_requirement,
            concurrency: d.concurrency,
            deployment_mode: if d.deployment.is_post_deployment() {
                "post-deployment"
            } else {
                "pre-deployment"
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Body<'a> {
    Recommendation(&'a RecommendationResult),
    Simulation(&'a [SimulationEntry]),
}

/// 一页分好的正文
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    pub total: usize,
    pub lines: Vec<String>,
}

impl Page {
    pub fn footer(&self) -> String {
        format!("{}    Page {} of {}", FOOTER_BRAND, self.number, self.total)
    }
}

pub struct Report<'a> {
    generated_at: DateTime<Utc>,
    configuration: ModelConfiguration,
    body: Body<'a>,
    hardware: &'a HardwareCatalog,
}

/// CSV 文本字段：总是加引号，内部引号加倍
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 硬件 id 只在必要时加引号
fn bare(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}

fn spec_field<'s>(spec: Option<&'s HardwareSpec>, pick: fn(&HardwareSpec) -> &str) -> &'s str {
    spec.map(pick).unwrap_or("N/A")
}

impl<'a> Report<'a> {
    pub fn recommendation(
        descriptor: &WorkloadDescriptor,
        result: &'a RecommendationResult,
        hardware: &'a HardwareCatalog,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            configuration: ModelConfiguration::from(descriptor),
            body: Body::Recommendation(result),
            hardware,
        }
    }

    pub fn simulation(
        descriptor: &WorkloadDescriptor,
        results: &'a [SimulationEntry],
        hardware: &'a HardwareCatalog,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            configuration: ModelConfiguration::from(descriptor),
            body: Body::Simulation(results),
            hardware,
        }
    }

    fn title(&self) -> &'static str {
        match self.body {
            Body::Recommendation(_) => "Hardware Recommendation Report",
            Body::Simulation(_) => "Performance Simulation Report",
        }
    }

    /// 下载文件名，例如 `simulation_report_2024-05-01.csv`
    pub fn filename(&self, format: ReportFormat) -> String {
        let prefix = match self.body {
            Body::Recommendation(_) => "recommendation_report",
            Body::Simulation(_) => "simulation_report",
        };
        format!(
            "{}_{}.{}",
            prefix,
            self.generated_at.format("%Y-%m-%d"),
            format.extension()
        )
    }

    fn spec(&self, hardware: &str) -> Option<&'a HardwareSpec> {
        self.hardware.get(hardware)
    }

    pub fn to_json_value(&self) -> Value {
        let metadata = json!({
            "generatedAt": self.generated_at.to_rfc3339(),
            "reportType": self.title(),
            "modelConfiguration": self.configuration,
        });

        match self.body {
            Body::Recommendation(result) => json!({
                "reportMetadata": metadata,
                "recommendation": {
                    "recommendedInstance": result.recommended_instance,
                    "specs": self.spec(&result.recommended_instance),
                    "expectedInferenceTimeMs": result.expected_inference_time_ms,
                    "costPer1000Inferences": result.cost_per_1000_inferences,
                    "peakMemoryUsageGb": result.peak_memory_usage_gb,
                    "explanation": result.explanation,
                },
                "alternatives": result.alternatives.iter().flatten().map(|alt| json!({
                    "hardware": alt.hardware,
                    "specs": self.spec(&alt.hardware),
                    "inferenceTimeMs": alt.inference_time_ms,
                    "costPer1000": alt.cost_per_1000,
                    "violatesLatency": alt.violates_latency,
                    "violatesThroughput": alt.violates_throughput,
                })).collect::<Vec<_>>(),
            }),
            Body::Simulation(results) => json!({
                "reportMetadata": metadata,
                "simulationResults": results.iter().map(|r| json!({
                    "hardware": r.hardware,
                    "specs": self.spec(&r.hardware),
                    "performance": {
                        "latencyMs": r.latency_ms,
                        "throughputQps": r.throughput_qps,
                        "costPer1000": r.cost_per_1000,
                        "memoryGb": r.memory_gb,
                    },
                })).collect::<Vec<_>>(),
            }),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(&self.to_json_value())?)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        match self.body {
            Body::Simulation(results) => {
                out.push_str("Hardware,Full Name,Latency (ms),Throughput (QPS),Cost per 1000,Memory (GB),Architecture,Memory Spec\n");
                for r in results {
                    let spec = self.spec(&r.hardware);
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{},{}\n",
                        bare(&r.hardware),
                        quoted(spec_field(spec, |s| s.full_name.as_str())),
                        r.latency_ms,
                        r.throughput_qps,
                        r.cost_per_1000,
                        r.memory_gb,
                        quoted(spec_field(spec, |s| s.architecture.as_str())),
                        quoted(spec_field(spec, |s| s.memory.as_str())),
                    ));
                }
            }
            Body::Recommendation(result) => {
                out.push_str("Hardware,Full Name,Inference Time (ms),Cost per 1000,Violates Latency,Violates Throughput,Architecture,Memory Spec\n");
                // 没有备选时只导出推荐项本身
                let rows: Vec<(&str, f64, f64, bool, bool)> = match &result.alternatives {
                    Some(alts) if !alts.is_empty() => alts
                        .iter()
                        .map(|a| {
                            (
                                a.hardware.as_str(),
                                a.inference_time_ms,
                                a.cost_per_1000,
                                a.violates_latency,
                                a.violates_throughput,
                            )
                        })
                        .collect(),
                    _ => vec![(
                        result.recommended_instance.as_str(),
                        result.expected_inference_time_ms,
                        result.cost_per_1000_inferences,
                        false,
                        false,
                    )],
                };
                for (hardware, time_ms, cost, v_lat, v_tput) in rows {
                    let spec = self.spec(hardware);
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{},{}\n",
                        bare(hardware),
                        quoted(spec_field(spec, |s| s.full_name.as_str())),
                        time_ms,
                        cost,
                        if v_lat { "Yes" } else { "No" },
                        if v_tput { "Yes" } else { "No" },
                        quoted(spec_field(spec, |s| s.architecture.as_str())),
                        quoted(spec_field(spec, |s| s.memory.as_str())),
                    ));
                }
            }
        }
        out
    }

    fn configuration_block(&self) -> Vec<String> {
        let c = &self.configuration;
        let mut lines = vec![
            "MODEL CONFIGURATION".to_string(),
            format!("Model Type: {}", c.model_type),
            format!("Framework: {}", c.framework),
            format!("Task Type: {}", c.task_type),
            format!("Model Size: {} MB", c.model_size_mb),
            format!("Parameters: {} million", c.parameters_millions),
            format!("FLOPs: {} billion", c.flops_billions),
            format!("Batch Size: {}", c.batch_size),
            format!("Concurrency: {}", c.concurrency),
            format!("Deployment Mode: {}", c.deployment_mode),
        ];
        if let Some(latency) = c.latency_requirement {
            lines.push(format!("Latency Requirement: {} ms", latency));
        }
        if let Some(throughput) = c.throughput_requirement {
            lines.push(format!("Throughput Requirement: {} QPS", throughput));
        }
        lines.push(String::new());
        lines
    }

    fn spec_lines(&self, hardware: &str, lines: &mut Vec<String>) {
        if let Some(spec) = self.spec(hardware) {
            lines.push(format!("   Architecture: {}", spec.architecture));
            lines.push(format!("   Memory Spec: {}", spec.memory));
            lines.push(format!("   Use Case: {}", spec.use_case));
        }
    }

    fn result_blocks(&self) -> Vec<Vec<String>> {
        let mut blocks = Vec::new();
        match self.body {
            Body::Simulation(results) => {
                blocks.push(vec!["SIMULATION RESULTS".to_string()]);
                for (i, r) in results.iter().enumerate() {
                    let mut lines = vec![format!("{}. {}", i + 1, r.hardware)];
                    if let Some(spec) = self.spec(&r.hardware) {
                        lines.push(format!("   {}", spec.full_name));
                    }
                    lines.push(format!("   Latency: {:.2} ms", r.latency_ms));
                    lines.push(format!("   Throughput: {:.2} QPS", r.throughput_qps));
                    lines.push(format!("   Cost per 1000: ${:.4}", r.cost_per_1000));
                    lines.push(format!("   Memory: {:.1} GB", r.memory_gb));
                    self.spec_lines(&r.hardware, &mut lines);
                    lines.push(String::new());
                    blocks.push(lines);
                }
            }
            Body::Recommendation(result) => {
                let mut lines = vec![
                    "RECOMMENDATION".to_string(),
                    format!("Recommended Instance: {}", result.recommended_instance),
                ];
                if let Some(spec) = self.spec(&result.recommended_instance) {
                    lines.push(format!("   {}", spec.full_name));
                }
                lines.push(format!(
                    "Expected Inference Time: {:.2} ms",
                    result.expected_inference_time_ms
                ));
                lines.push(format!(
                    "Cost per 1000 Inferences: ${:.4}",
                    result.cost_per_1000_inferences
                ));
                if let Some(peak) = result.peak_memory_usage_gb {
                    lines.push(format!("Peak Memory Usage: {:.2} GB", peak));
                }
                if let Some(explanation) = &result.explanation {
                    lines.push(format!("Explanation: {}", explanation));
                }
                self.spec_lines(&result.recommended_instance, &mut lines);
                lines.push(String::new());
                blocks.push(lines);

                if let Some(alts) = result.alternatives.as_ref().filter(|a| !a.is_empty()) {
                    blocks.push(vec!["ALTERNATIVES".to_string()]);
                    for (i, alt) in alts.iter().enumerate() {
                        let mut lines = vec![format!("{}. {}", i + 1, alt.hardware)];
                        lines.push(format!("   Inference Time: {:.2} ms", alt.inference_time_ms));
                        lines.push(format!("   Cost per 1000: ${:.4}", alt.cost_per_1000));
                        if alt.violates_latency {
                            lines.push("   Violates latency requirement".to_string());
                        }
                        if alt.violates_throughput {
                            lines.push("   Violates throughput requirement".to_string());
                        }
                        lines.push(String::new());
                        blocks.push(lines);
                    }
                }
            }
        }
        blocks
    }

    /// 分页。一个块放不下时整体挪到下一页；比整页还长的块照常断开。
    pub fn pages(&self) -> Vec<Page> {
        let mut blocks = vec![vec![
            self.title().to_uppercase(),
            format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
            String::new(),
        ]];
        blocks.push(self.configuration_block());
        blocks.extend(self.result_blocks());

        let mut pages: Vec<Vec<String>> = vec![Vec::new()];
        for block in blocks {
            let used = pages.last().map(Vec::len).unwrap_or(0);
            if used > 0 && used + block.len() > LINES_PER_PAGE && block.len() <= LINES_PER_PAGE {
                pages.push(Vec::new());
            }
            for line in block {
                if pages.last().map(Vec::len).unwrap_or(0) >= LINES_PER_PAGE {
                    pages.push(Vec::new());
                }
                if let Some(page) = pages.last_mut() {
                    page.push(line);
                }
            }
        }

        let total = pages.len();
        pages
            .into_iter()
            .enumerate()
            .map(|(i, lines)| Page {
                number: i + 1,
                total,
                lines,
            })
            .collect()
    }

    /// 纯文本版，页之间用换页符分隔
    pub fn to_text(&self) -> String {
        self.pages()
            .iter()
            .map(|page| {
                let mut text = page.lines.join("\n");
                text.push_str("\n\n");
                text.push_str(&page.footer());
                text.push('\n');
                text
            })
            .collect::<Vec<_>>()
            .join("\x0c")
    }

    pub fn to_pdf(&self, font_dir: &str, font_family: &str) -> Result<Vec<u8>, ReportError> {
        let font = genpdf::fonts::from_files(font_dir, font_family, None).map_err(|e| {
            ReportError::FontUnavailable {
                dir: font_dir.to_string(),
                family: font_family.to_string(),
                message: e.to_string(),
            }
        })?;

        let mut doc = Document::new(font);
        doc.set_title(self.title());
        doc.set_font_size(10);
        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(20);
        doc.set_page_decorator(decorator);

        let heading = Style::new().bold().with_font_size(14);
        let footer = Style::new().with_font_size(8);

        for (i, page) in self.pages().iter().enumerate() {
            if i > 0 {
                doc.push(PageBreak::new());
            }
            for (j, line) in page.lines.iter().enumerate() {
                if line.is_empty() {
                    doc.push(Break::new(1));
                } else if i == 0 && j == 0 {
                    doc.push(Paragraph::new(StyledString::new(line.clone(), heading)));
                } else {
                    doc.push(Paragraph::new(line.as_str()));
                }
            }
            doc.push(Break::new(1));
            doc.push(Paragraph::new(StyledString::new(page.footer(), footer)));
        }

        let mut out = Vec::new();
        doc.render(&mut out).map_err(|e| ReportError::Render {
            message: e.to_string(),
        })?;
        Ok(out)
    }
}
