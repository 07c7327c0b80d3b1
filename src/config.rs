use std::collections::HashMap;
use std::time::Duration;

use rocket::figment::providers::{Env, Format, Serialized, Toml};
use rocket::figment::Figment;
use serde::{Deserialize, Serialize};

use crate::estimator::{FlopsCatalog, TagMatch, DEFAULT_MULTIPLIER};
use crate::gateway::{join_url, Endpoint};
use crate::hardware::{HardwareCatalog, HardwareSpec};

/// 使用哪一份内置系数表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlopsCatalogKind {
    #[default]
    Standard,
    Family,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 评分服务根地址，例如 `http://localhost:5000`
    pub scoring_base_url: String,
    pub optimize_path: String,
    pub simulate_path: String,
    /// 本服务对外可达的根地址，备用的 mock 路由从这里拼出来
    pub public_base_url: String,
    pub mock_optimize_path: String,
    pub mock_simulate_path: String,
    /// mock 路由回复前的人为延迟
    pub mock_delay_ms: u64,
    /// 代理路由等待上游的上限，不设则一直等
    pub request_timeout_secs: Option<u64>,
    pub flops_catalog: FlopsCatalogKind,
    /// 覆盖内置系数表
    pub flops_multipliers: Option<HashMap<String, f64>>,
    pub default_multiplier: f64,
    /// 覆盖内置硬件规格表
    pub hardware: Option<HashMap<String, HardwareSpec>>,
    pub report_font_dir: String,
    pub report_font_family: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring_base_url: "http://localhost:5000".to_string(),
            optimize_path: "/optimize".to_string(),
            simulate_path: "/simulate".to_string(),
            public_base_url: "http://127.0.0.1:8000".to_string(),
            mock_optimize_path: "/api/mock/optimize".to_string(),
            mock_simulate_path: "/api/mock/simulate".to_string(),
            mock_delay_ms: 1500,
            request_timeout_secs: None,
            flops_catalog: FlopsCatalogKind::Standard,
            flops_multipliers: None,
            default_multiplier: DEFAULT_MULTIPLIER,
            hardware: None,
            report_font_dir: "/usr/share/fonts/truetype/liberation".to_string(),
            report_font_family: "LiberationSans".to_string(),
        }
    }
}

impl AppConfig {
    /// Rocket 自己的配置 + 默认值 + `Optimizer.toml` + `OPTIMIZER_*` 环境变量
    pub fn figment() -> Figment {
        rocket::Config::figment()
            .join(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(Env::var_or("OPTIMIZER_CONFIG", "Optimizer.toml")).nested())
            .merge(Env::prefixed("OPTIMIZER_").global())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, Box<rocket::figment::Error>> {
        figment.extract().map_err(Box::new)
    }

    pub fn recommend_endpoint(&self) -> Endpoint {
        Endpoint::remote(join_url(&self.scoring_base_url, &self.optimize_path))
    }

    pub fn simulate_endpoint(&self) -> Endpoint {
        Endpoint::remote(join_url(&self.scoring_base_url, &self.simulate_path))
    }

    pub fn mock_recommend_endpoint(&self) -> Endpoint {
        Endpoint::same_origin(&self.public_base_url, &self.mock_optimize_path)
    }

    pub fn mock_simulate_endpoint(&self) -> Endpoint {
        Endpoint::same_origin(&self.public_base_url, &self.mock_simulate_path)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn flops_catalog(&self) -> FlopsCatalog {
        let base = match self.flops_catalog {
            FlopsCatalogKind::Standard => FlopsCatalog::standard(),
            FlopsCatalogKind::Family => FlopsCatalog::family(),
        };
        let tag_match: TagMatch = base.tag_match();
        match &self.flops_multipliers {
            Some(table) => FlopsCatalog::new(table.clone(), self.default_multiplier, tag_match),
            None => FlopsCatalog::new(
                base.entries()
                    .into_iter()
                    .map(|(tag, m)| (tag.to_string(), m))
                    .collect(),
                self.default_multiplier,
                tag_match,
            ),
        }
    }

    pub fn hardware_catalog(&self) -> HardwareCatalog {
        match &self.hardware {
            Some(specs) => HardwareCatalog::new(specs.clone()),
            None => HardwareCatalog::standard(),
        }
    }
}
