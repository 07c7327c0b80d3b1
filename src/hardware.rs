use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareSpec {
    pub full_name: String,
    pub memory: String,
    pub tensor_cores: String,
    pub fp16_performance: String,
    pub fp32_performance: String,
    pub memory_bandwidth: String,
    pub power_consumption: String,
    pub architecture: String,
    pub use_case: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub considerations: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
fn spec(
    full_name: &str,
    memory: &str,
    tensor_cores: &str,
    fp16: &str,
    fp32: &str,
    bandwidth: &str,
    power: &str,
    architecture: &str,
    use_case: &str,
    strengths: &[&str],
    considerations: &[&str],
) -> HardwareSpec {
    HardwareSpec {
        full_name: full_name.to_string(),
        memory: memory.to_string(),
        tensor_cores: tensor_cores.to_string(),
        fp16_performance: fp16.to_string(),
        fp32_performance: fp32.to_string(),
        memory_bandwidth: bandwidth.to_string(),
        power_consumption: power.to_string(),
        architecture: architecture.to_string(),
        use_case: use_case.to_string(),
        strengths: strengths.iter().map(|s| s.to_string()).collect(),
        considerations: considerations.iter().map(|s| s.to_string()).collect(),
    }
}

/// 硬件规格表，只用于展示和报表里的查找
#[derive(Debug, Clone)]
pub struct HardwareCatalog {
    specs: HashMap<String, HardwareSpec>,
}

impl HardwareCatalog {
    pub fn new(specs: HashMap<String, HardwareSpec>) -> Self {
        Self { specs }
    }

    /// 内置的一份规格表
    pub fn standard() -> Self {
        let mut specs = HashMap::new();
        specs.insert(
            "A100".to_string(),
            spec(
                "NVIDIA A100 Tensor Core GPU",
                "40GB HBM2e",
                "432 Tensor Cores (3rd gen)",
                "312 TFLOPS",
                "19.5 TFLOPS",
                "1,555 GB/s",
                "400W",
                "Ampere",
                "High-performance training and inference for large models",
                &["Exceptional performance for large models", "High memory capacity", "Advanced Tensor Cores"],
                &["Higher cost", "High power consumption"],
            ),
        );
        specs.insert(
            "H100".to_string(),
            spec(
                "NVIDIA H100 Tensor Core GPU",
                "80GB HBM3",
                "528 Tensor Cores (4th gen)",
                "989 TFLOPS",
                "67 TFLOPS",
                "3,350 GB/s",
                "700W",
                "Hopper",
                "Next-generation AI training and inference",
                &["Cutting-edge performance", "Massive memory capacity", "Latest architecture"],
                &["Premium pricing", "Very high power consumption"],
            ),
        );
        specs.insert(
            "A10".to_string(),
            spec(
                "NVIDIA A10 GPU",
                "24GB GDDR6",
                "192 Tensor Cores (3rd gen)",
                "125 TFLOPS",
                "31.2 TFLOPS",
                "600 GB/s",
                "150W",
                "Ampere",
                "Balanced performance for inference and light training",
                &["Good price-performance ratio", "Moderate power consumption", "Versatile"],
                &["Lower memory than A100", "Less suitable for very large models"],
            ),
        );
        specs.insert(
            "A10g".to_string(),
            spec(
                "NVIDIA A10G GPU",
                "24GB GDDR6",
                "192 Tensor Cores (3rd gen)",
                "125 TFLOPS",
                "31.2 TFLOPS",
                "600 GB/s",
                "300W",
                "Ampere",
                "Cloud-optimized inference and training",
                &["Cloud-optimized design", "Good memory capacity", "Efficient for inference"],
                &["Higher power than A10", "Cloud-specific optimization"],
            ),
        );
        specs.insert(
            "T4".to_string(),
            spec(
                "NVIDIA Tesla T4 GPU",
                "16GB GDDR6",
                "320 Tensor Cores (2nd gen)",
                "65 TFLOPS",
                "8.1 TFLOPS",
                "300 GB/s",
                "70W",
                "Turing",
                "Cost-effective inference for smaller models",
                &["Very low power consumption", "Cost-effective", "Good for inference"],
                &["Limited memory", "Older architecture", "Lower performance"],
            ),
        );
        specs.insert(
            "RTX_3070".to_string(),
            spec(
                "NVIDIA GeForce RTX 3070",
                "8GB GDDR6",
                "184 Tensor Cores (2nd gen)",
                "40 TFLOPS",
                "20.3 TFLOPS",
                "448 GB/s",
                "220W",
                "Ampere",
                "Development and small-scale inference",
                &["Consumer-grade pricing", "Good for development", "Widely available"],
                &["Limited memory", "Not optimized for enterprise", "Gaming-focused"],
            ),
        );
        specs.insert(
            "RTX_A5000".to_string(),
            spec(
                "NVIDIA RTX A5000",
                "24GB GDDR6",
                "256 Tensor Cores (2nd gen)",
                "67 TFLOPS",
                "27.8 TFLOPS",
                "768 GB/s",
                "230W",
                "Ampere",
                "Professional workstation AI workloads",
                &["Professional drivers", "Good memory capacity", "Workstation reliability"],
                &["Higher cost than consumer GPUs", "Lower performance than datacenter GPUs"],
            ),
        );
        specs.insert(
            "CPU".to_string(),
            spec(
                "CPU-only Processing",
                "System RAM dependent",
                "N/A",
                "Varies by CPU",
                "Varies by CPU",
                "System dependent",
                "65-280W",
                "x86/ARM",
                "Small models, development, or GPU-unavailable scenarios",
                &["No GPU required", "Lower cost", "High memory capacity potential"],
                &["Much slower inference", "No tensor acceleration", "Limited parallelism"],
            ),
        );

        Self { specs }
    }

    pub fn get(&self, hardware: &str) -> Option<&HardwareSpec> {
        self.specs.get(hardware)
    }

    /// 按硬件 id 排序
    pub fn list(&self) -> Vec<(&str, &HardwareSpec)> {
        let mut out: Vec<(&str, &HardwareSpec)> =
            self.specs.iter().map(|(id, s)| (id.as_str(), s)).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

impl Default for HardwareCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
