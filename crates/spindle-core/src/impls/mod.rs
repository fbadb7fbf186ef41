//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **BroadcastDelivery**: tokio broadcast による Delivery Channel
//! - **ReverseUppercase**: 参照用の Processing Function

pub mod broadcast_delivery;
pub mod reverse_upper;

// 主要な型を再エクスポート
pub use self::broadcast_delivery::{BroadcastDelivery, OutcomeStream};
pub use self::reverse_upper::ReverseUppercase;
