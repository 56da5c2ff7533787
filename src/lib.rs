//! 论坛权限服务
//! 声明式权限解析：权限声明 + 资源 ID 解析 + 基于角色的授权判断

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
