//! # Petri 网图引擎（普通 P/T 网，弧权恒为 1）
//!
//! 网由库所集合 `P`、迁移集合 `T` 与弧集合 `F ⊆ (P×T) ∪ (T×P)` 构成，每个元素以
//! 字符串标识符访问，节点与弧共享同一命名空间。对当前标识 `M`：
//!
//! * 迁移 `t` **可发生** 当且仅当 `∀p ∈ •t: M[p] > 0`，无前驱的迁移恒可发生；
//! * 迁移 **发生** 后每个前驱库所失去一个令牌，每个后继库所获得一个令牌；
//!   **逆发生** 与之相反。
//!
//! 引擎在结构编辑（增删库所、迁移、弧）与令牌变更之后增量维护每个迁移的
//! 使能标志，仅在标志真正翻转时向观察者发出通知。
//!
//! ## 示例
//!
//! ```rust
//! use pn_engine::net::*;
//!
//! let mut net = Net::new();
//! let recorder = EventRecorder::new();
//! net.subscribe(recorder.clone());
//!
//! net.add_place(0, 0, "p0").unwrap();
//! net.add_place(0, 0, "p1").unwrap();
//! net.add_transition(0, 0, "t0").unwrap();
//! net.add_arc("p0", "t0", "a0").unwrap();
//! net.add_arc("t0", "p1", "a1").unwrap();
//! assert!(!net.state("t0").unwrap());
//!
//! net.change_tokens("p0", 1).unwrap();
//! assert!(net.state("t0").unwrap());
//!
//! net.perform_transition("t0").unwrap();
//! assert_eq!(net.token_count("p0").unwrap(), 0);
//! assert_eq!(net.token_count("p1").unwrap(), 1);
//! assert_eq!(recorder.state_changes().len(), 3);
//! ```

pub mod arc;
pub mod core;
pub mod diagnostics;
pub mod events;
pub mod factory;
pub(crate) mod firing;
pub mod ids;
pub mod structure;

pub use arc::{Arc, ArcDirection};
pub use self::core::{ErrorKind, Net, NetError};
pub use diagnostics::DiagnosticReport;
pub use events::{EventBatch, EventRecorder, NetEvent, NetObserver};
pub use factory::{DefaultFactory, ElementFactory};
pub use ids::ElementId;
pub use structure::{Coordinates, Node, NodeKind, Tokens};
