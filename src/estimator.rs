use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// 表里找不到架构时使用的系数
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// 按具体型号给出的系数（十亿 FLOPs / 百万参数）
const STANDARD_MULTIPLIERS: &[(&str, f64)] = &[
    // 视觉
    ("CNN_Small", 0.5),
    ("CNN_Large", 2.0),
    ("ResNet18", 0.5),
    ("ResNet50", 1.15),
    ("ResNet101", 2.0),
    ("MobileNetV2", 0.25),
    ("MobileNetV3", 0.3),
    ("EfficientNet_B0", 0.4),
    ("EfficientNet_B4", 1.3),
    ("ViT_Small", 1.0),
    ("ViT_Base", 2.0),
    ("ViT_Large", 4.0),
    ("ConvNeXt_Tiny", 1.3),
    ("ConvNeXt_Base", 3.0),
    ("YOLO_v5s", 0.55),
    ("YOLO_v8m", 1.7),
    // NLP
    ("LSTM_Small", 0.5),
    ("LSTM_Large", 1.25),
    ("GRU_Medium", 0.75),
    ("BERT_tiny", 0.3),
    ("BERT_base", 1.65),
    ("BERT_large", 4.0),
    ("RoBERTa_base", 1.8),
    ("DistilBERT", 0.95),
    ("GPT2_small", 1.9),
    ("GPT2_medium", 4.5),
    ("GPT2_large", 9.5),
    ("T5_small", 1.25),
    ("T5_base", 3.25),
    ("Transformer_Small", 0.75),
    ("Transformer_Base", 1.9),
    ("LLaMA_7B", 100.0),
    ("LLaMA_13B", 200.0),
];

/// 按模型家族（`_` 之前的部分）给出的粗粒度系数
const FAMILY_MULTIPLIERS: &[(&str, f64)] = &[
    ("CNN", 2.0),
    ("BERT", 4.0),
    ("ViT", 4.0),
    ("ResNet", 2.0),
    ("EfficientNet", 1.5),
    ("MobileNet", 1.0),
    ("DenseNet", 2.5),
    ("Inception", 2.0),
    ("GPT2", 6.0),
    ("T5", 5.0),
    ("LSTM", 3.0),
    ("LLM", 6.0),
];

/// 架构标签如何与表项匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    /// 整个标签必须是表里的键
    #[default]
    Exact,
    /// 只取第一个 `_` 之前的部分，`GPT2_Large` 查 `GPT2`
    Family,
}

/// FLOPs 估算用的系数表。初始化之后只读。
#[derive(Debug, Clone)]
pub struct FlopsCatalog {
    multipliers: HashMap<String, f64>,
    default_multiplier: f64,
    tag_match: TagMatch,
}

impl FlopsCatalog {
    pub fn new(
        multipliers: HashMap<String, f64>,
        default_multiplier: f64,
        tag_match: TagMatch,
    ) -> Self {
        Self {
            multipliers,
            default_multiplier,
            tag_match,
        }
    }

    pub fn standard() -> Self {
        Self::from_table(STANDARD_MULTIPLIERS, TagMatch::Exact)
    }

    pub fn family() -> Self {
        Self::from_table(FAMILY_MULTIPLIERS, TagMatch::Family)
    }

    fn from_table(table: &[(&str, f64)], tag_match: TagMatch) -> Self {
        let multipliers = table
            .iter()
            .map(|(tag, m)| (tag.to_string(), *m))
            .collect();
        Self::new(multipliers, DEFAULT_MULTIPLIER, tag_match)
    }

    pub fn tag_match(&self) -> TagMatch {
        self.tag_match
    }

    pub fn default_multiplier(&self) -> f64 {
        self.default_multiplier
    }

    fn key<'a>(&self, model_architecture: &'a str) -> &'a str {
        match self.tag_match {
            TagMatch::Exact => model_architecture,
            TagMatch::Family => model_architecture
                .split('_')
                .next()
                .unwrap_or(model_architecture),
        }
    }

    pub fn multiplier(&self, model_architecture: &str) -> f64 {
        self.multipliers
            .get(self.key(model_architecture))
            .copied()
            .unwrap_or(self.default_multiplier)
    }

    /// 估算 FLOPs（十亿），固定两位小数。
    ///
    /// 不做输入校验：调用方保证 `parameters_millions` 是有限的非负数。
    pub fn estimate(&self, model_architecture: &str, parameters_millions: f64) -> String {
        format_flops(parameters_millions * self.multiplier(model_architecture))
    }

    /// 按标签排序的表项
    pub fn entries(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self
            .multipliers
            .iter()
            .map(|(tag, m)| (tag.as_str(), *m))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl Default for FlopsCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn format_flops(value: f64) -> String {
    format!("{:.2}", value)
}

static STANDARD: LazyLock<FlopsCatalog> = LazyLock::new(FlopsCatalog::standard);

/// 用内置的标准表估算
pub fn estimate(model_architecture: &str, parameters_millions: f64) -> String {
    STANDARD.estimate(model_architecture, parameters_millions)
}
