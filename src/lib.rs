#[macro_use]
extern crate rocket;

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod estimator;
pub mod form;
pub mod gateway;
pub mod hardware;
pub mod mock;
pub mod report;
pub mod types;

use std::sync::Arc;

use rocket::figment::Figment;
use rocket::{Build, Rocket};

use api::{
    estimate_flops, fallback, hardware_spec, health, list_architectures, list_hardware,
    mock_optimize, mock_simulate, not_found, optimize, recommendation_report, simulate,
    simulation_report, unprocessable,
};
use app_state::AppState;

/// 组装服务；`main` 和集成测试共用
pub fn rocket(figment: Figment, state: Arc<AppState>) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                health,
                list_architectures,
                estimate_flops,
                list_hardware,
                hardware_spec,
                optimize,
                simulate,
                mock_optimize,
                mock_simulate,
                recommendation_report,
                simulation_report,
            ],
        )
        .register("/", catchers![not_found, unprocessable, fallback])
}
