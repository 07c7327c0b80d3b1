use std::sync::Arc;

use crate::config::AppConfig;
use crate::estimator::FlopsCatalog;
use crate::gateway::{Endpoint, Gateway, Submission};
use crate::hardware::HardwareCatalog;
use crate::types::WorkloadDescriptor;

/// 进程内共享状态，启动后只读：
/// - config: 启动时解析好的配置
/// - gateway: 无状态，多个请求可以并发使用
/// - flops / hardware: 估算和报表用的查找表
pub struct AppState {
    pub config: AppConfig,
    pub gateway: Gateway,
    pub flops: FlopsCatalog,
    pub hardware: HardwareCatalog,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Gateway) -> Arc<Self> {
        Arc::new(Self {
            flops: config.flops_catalog(),
            hardware: config.hardware_catalog(),
            config,
            gateway,
        })
    }

    pub fn recommend_endpoint(&self) -> Endpoint {
        self.config.recommend_endpoint()
    }

    pub fn simulate_endpoint(&self) -> Endpoint {
        self.config.simulate_endpoint()
    }

    fn submission(
        &self,
        descriptor: WorkloadDescriptor,
        primary: Endpoint,
        mock: Endpoint,
        fallback: bool,
    ) -> Submission {
        let submission =
            Submission::new(descriptor, primary).with_timeout(self.config.request_timeout());
        if fallback {
            submission.with_fallback(mock)
        } else {
            submission
        }
    }

    /// 代理路由用的提交；`fallback` 为真时把 mock 路由挂为备用地址
    pub fn recommend_submission(
        &self,
        descriptor: WorkloadDescriptor,
        fallback: bool,
    ) -> Submission {
        self.submission(
            descriptor,
            self.recommend_endpoint(),
            self.config.mock_recommend_endpoint(),
            fallback,
        )
    }

    pub fn simulate_submission(
        &self,
        descriptor: WorkloadDescriptor,
        fallback: bool,
    ) -> Submission {
        self.submission(
            descriptor,
            self.simulate_endpoint(),
            self.config.mock_simulate_endpoint(),
            fallback,
        )
    }
}
