//! 数据模型模块

pub mod context;
pub mod permission;
pub mod role;
