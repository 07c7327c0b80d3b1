//! 离线/备用的假评分服务，返回固定的结果。

use crate::types::{
    AlternativeOption, Deployment, RecommendationResult, SimulationEntry, SimulationResult,
    WorkloadDescriptor,
};

fn alt(
    hardware: &str,
    inference_time_ms: f64,
    cost_per_1000: f64,
    violates_latency: bool,
    violates_throughput: bool,
) -> AlternativeOption {
    AlternativeOption {
        hardware: hardware.to_string(),
        inference_time_ms,
        cost_per_1000,
        violates_latency,
        violates_throughput,
    }
}

fn result(
    instance: &str,
    time_ms: f64,
    cost: f64,
    explanation: &str,
    alternatives: Vec<AlternativeOption>,
) -> RecommendationResult {
    RecommendationResult {
        recommended_instance: instance.to_string(),
        expected_inference_time_ms: time_ms,
        cost_per_1000_inferences: cost,
        peak_memory_usage_gb: None,
        explanation: Some(explanation.to_string()),
        alternatives: Some(alternatives),
    }
}

pub fn recommend(descriptor: &WorkloadDescriptor) -> RecommendationResult {
    match descriptor.deployment {
        Deployment::PreDeployment => result(
            "H100",
            0.88,
            0.001,
            "H100 meets your SLA at $0.00100 per 1000 inferences and latency 0.88 ms. \
             The next best is A100 at $0.00100 per 1000 inferences and latency 1.02 ms.",
            vec![
                alt("H100", 0.883, 0.001, false, false),
                alt("A100", 1.021, 0.001, false, false),
                alt("A10", 4.886, 0.001, false, false),
                alt("RTX_3070", 7.968, 0.001, false, false),
                alt("RTX_A5000", 5.586, 0.002, false, false),
            ],
        ),
        // 显存占用高但算力闲置：换显存大、算力小的卡
        Deployment::PostDeployment(m) if m.gpu_utilization < 50.0 && m.gpu_memory_usage > 70.0 => {
            result(
                "A10g",
                28.45,
                0.0165,
                "A10g is recommended based on your current resource metrics. GPU utilization is \
                 under 50% while memory usage is over 70%, so a GPU with more memory and less \
                 compute fits the workload better.",
                vec![
                    alt("A10g", 28.45, 0.0165, false, false),
                    alt("A100", 18.72, 0.0312, false, false),
                    alt("T4", 42.18, 0.0098, true, false),
                    alt("RTX_3070", 35.65, 0.0145, false, false),
                ],
            )
        }
        Deployment::PostDeployment(m) if m.gpu_utilization > 80.0 => result(
            "A100",
            18.72,
            0.0312,
            "A100 is recommended based on your current resource metrics. GPU utilization is over \
             80%, so the workload needs a more powerful GPU.",
            vec![
                alt("A100", 18.72, 0.0312, false, false),
                alt("H100", 12.35, 0.0425, false, false),
                alt("A10g", 28.45, 0.0165, false, true),
                alt("RTX_A5000", 25.92, 0.0185, false, true),
            ],
        ),
        Deployment::PostDeployment(_) => result(
            "A10",
            32.18,
            0.0187,
            "A10 is recommended as a balanced option for your workload based on current resource \
             utilization patterns.",
            vec![
                alt("A10", 32.18, 0.0187, false, false),
                alt("A100", 18.72, 0.0312, false, false),
                alt("T4", 45.32, 0.0098, false, false),
                alt("RTX_3070", 38.45, 0.0145, false, false),
            ],
        ),
    }
}

/// 固定的单样本延迟表，吞吐和显存按请求推出来
const SIMULATED_LATENCY: &[(&str, f64, f64)] = &[
    ("H100", 0.883, 0.001),
    ("A100", 1.021, 0.001),
    ("A10", 4.886, 0.001),
    ("RTX_A5000", 5.586, 0.002),
    ("RTX_3070", 7.968, 0.001),
    ("T4", 9.412, 0.0008),
];

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn simulate(descriptor: &WorkloadDescriptor) -> SimulationResult {
    let batch = f64::from(descriptor.batch_size);
    let memory_gb = round_to(descriptor.model_size_mb / 1024.0, 3);

    SIMULATED_LATENCY
        .iter()
        .map(|(hardware, latency_ms, cost)| SimulationEntry {
            hardware: hardware.to_string(),
            latency_ms: *latency_ms,
            throughput_qps: round_to(batch * 1000.0 / latency_ms, 2),
            cost_per_1000: *cost,
            memory_gb,
        })
        .collect()
}
