//! 诊断与可视化：连通性检查报告与 Graphviz DOT 输出。
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use crate::net::arc::ArcDirection;
use crate::net::core::Net;
use crate::net::ids::ElementId;
use crate::net::structure::NodeKind;

/// Petri 网连通性诊断报告
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    /// 孤立库所（无任何连接的弧）
    pub isolated_places: Vec<ElementId>,
    /// 孤立变迁（无任何连接的弧）
    pub isolated_transitions: Vec<ElementId>,
    /// 有弧但无前置库所的变迁，始终可发生
    pub source_transitions: Vec<ElementId>,
    /// 总库所数
    pub total_places: usize,
    /// 总变迁数
    pub total_transitions: usize,
}

impl DiagnosticReport {
    /// 是否存在问题
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.source_transitions.is_empty()
    }
}

impl Net {
    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
            ..Default::default()
        };

        for node in self.nodes() {
            let isolated = node.arcs().next().is_none();
            match node.kind() {
                NodeKind::Place { .. } if isolated => {
                    report.isolated_places.push(node.id().clone());
                }
                NodeKind::Transition { .. } if isolated => {
                    report.isolated_transitions.push(node.id().clone());
                }
                NodeKind::Transition { .. } if !node.has_predecessors() => {
                    report.source_transitions.push(node.id().clone());
                }
                _ => {}
            }
        }
        report
    }

    /// 打印诊断报告到日志
    pub fn log_diagnostics(&self) -> DiagnosticReport {
        let report = self.diagnose_connectivity();

        if report.has_issues() {
            log::warn!("=== Petri 网连通性诊断报告 ===");
            log::warn!(
                "总计: {} 个库所, {} 个变迁",
                report.total_places,
                report.total_transitions
            );
            if !report.isolated_places.is_empty() {
                log::warn!("发现 {} 个孤立库所:", report.isolated_places.len());
                for id in &report.isolated_places {
                    log::warn!("  - {}", id);
                }
            }
            if !report.isolated_transitions.is_empty() {
                log::warn!("发现 {} 个孤立变迁:", report.isolated_transitions.len());
                for id in &report.isolated_transitions {
                    log::warn!("  - {}", id);
                }
            }
            for id in &report.source_transitions {
                log::warn!("变迁 '{}' 无前置库所，始终可发生", id);
            }
            log::warn!("=== 诊断报告结束 ===");
        } else {
            log::info!("Petri 网连通性检查通过，无孤立节点");
        }
        report
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for node in self.nodes() {
            let label = if node.name().is_empty() {
                escape_label(node.id().as_str())
            } else {
                format!(
                    "{}\\n{}",
                    escape_label(node.id().as_str()),
                    escape_label(node.name())
                )
            };
            let position = node.position();
            match node.kind() {
                NodeKind::Place { tokens } => {
                    let _ = writeln!(
                        &mut dot,
                        "    \"{}\" [label=\"{}\\n{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\", pos=\"{},{}\"];",
                        escape_label(node.id().as_str()),
                        label,
                        tokens,
                        position.x,
                        position.y
                    );
                }
                NodeKind::Transition { enabled } => {
                    let fill = if *enabled { "#c8e6c9" } else { "#ffe0b2" };
                    let _ = writeln!(
                        &mut dot,
                        "    \"{}\" [label=\"{}\", shape=box, style=filled, fillcolor=\"{}\", pos=\"{},{}\"];",
                        escape_label(node.id().as_str()),
                        label,
                        fill,
                        position.x,
                        position.y
                    );
                }
            }
        }

        for arc in self.arcs() {
            let style = match arc.direction() {
                ArcDirection::PlaceToTransition => "solid",
                ArcDirection::TransitionToPlace => "bold",
            };
            let _ = writeln!(
                &mut dot,
                "    \"{}\" -> \"{}\" [label=\"{}\", style={}];",
                escape_label(arc.source().as_str()),
                escape_label(arc.target().as_str()),
                escape_label(arc.id().as_str()),
                style
            );
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
