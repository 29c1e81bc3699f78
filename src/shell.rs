//! 命令行外壳：逐行解析命令并驱动网引擎，输出引擎发出的事件。
use std::io::{BufRead, Write};
use std::num::ParseIntError;

use anyhow::Result;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::PnConfig;
use crate::net::{EventRecorder, Net, NetError, NetEvent, NodeKind};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("mismatched quotes")]
    Quotes(#[from] shellwords::MismatchedQuotes),
    #[error("unknown command `{0}`, try `help`")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("`{arg}` is not a number")]
    Number {
        arg: String,
        #[source]
        source: ParseIntError,
    },
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("cannot write {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Place { x: i32, y: i32, id: String },
    Transition { x: i32, y: i32, id: String },
    Arc { source: String, target: String, id: String },
    RemoveNode(String),
    RemoveArc(String),
    Name { id: String, name: String },
    Move { id: String, x: i32, y: i32 },
    Tokens { id: String, count: i64 },
    Fire(String),
    Unfire(String),
    Run { steps: usize, seed: Option<u64> },
    State(String),
    Show,
    Check,
    Diagnose,
    Dot(Option<String>),
    Reset,
    Help,
    Quit,
}

const HELP: &str = "\
place X Y ID         add a place
transition X Y ID    add a transition
arc SRC TGT ID       add an arc between a place and a transition
rm ID                remove a node and its arcs
rmarc ID             remove an arc
name ID NAME         rename a node
move ID X Y          move a node
tokens ID N          set the token count of a place
fire ID              fire a transition
unfire ID            reverse-fire a transition
run STEPS [SEED]     fire randomly chosen enabled transitions
state ID             show a node
show                 list the whole net
check                recompute enablement from scratch
diag                 connectivity report
dot [PATH]           Graphviz output
reset                drop every node and arc
quit                 leave";

fn number<T>(arg: &str) -> Result<T, ShellError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    arg.parse().map_err(|source| ShellError::Number {
        arg: arg.to_string(),
        source,
    })
}

impl ShellCommand {
    /// Parses one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let words = shellwords::split(line)?;
        let args = words.iter().map(String::as_str).collect::<Vec<_>>();
        let command = match args.as_slice() {
            ["place", x, y, id] => ShellCommand::Place {
                x: number(x)?,
                y: number(y)?,
                id: id.to_string(),
            },
            ["place", ..] => return Err(ShellError::Usage("place X Y ID")),
            ["transition", x, y, id] => ShellCommand::Transition {
                x: number(x)?,
                y: number(y)?,
                id: id.to_string(),
            },
            ["transition", ..] => return Err(ShellError::Usage("transition X Y ID")),
            ["arc", source, target, id] => ShellCommand::Arc {
                source: source.to_string(),
                target: target.to_string(),
                id: id.to_string(),
            },
            ["arc", ..] => return Err(ShellError::Usage("arc SRC TGT ID")),
            ["rm", id] => ShellCommand::RemoveNode(id.to_string()),
            ["rm", ..] => return Err(ShellError::Usage("rm ID")),
            ["rmarc", id] => ShellCommand::RemoveArc(id.to_string()),
            ["rmarc", ..] => return Err(ShellError::Usage("rmarc ID")),
            ["name", id, name] => ShellCommand::Name {
                id: id.to_string(),
                name: name.to_string(),
            },
            ["name", ..] => return Err(ShellError::Usage("name ID NAME")),
            ["move", id, x, y] => ShellCommand::Move {
                id: id.to_string(),
                x: number(x)?,
                y: number(y)?,
            },
            ["move", ..] => return Err(ShellError::Usage("move ID X Y")),
            ["tokens", id, count] => ShellCommand::Tokens {
                id: id.to_string(),
                count: number(count)?,
            },
            ["tokens", ..] => return Err(ShellError::Usage("tokens ID N")),
            ["fire", id] => ShellCommand::Fire(id.to_string()),
            ["fire", ..] => return Err(ShellError::Usage("fire ID")),
            ["unfire", id] => ShellCommand::Unfire(id.to_string()),
            ["unfire", ..] => return Err(ShellError::Usage("unfire ID")),
            ["run", steps] => ShellCommand::Run {
                steps: number(steps)?,
                seed: None,
            },
            ["run", steps, seed] => ShellCommand::Run {
                steps: number(steps)?,
                seed: Some(number(seed)?),
            },
            ["run", ..] => return Err(ShellError::Usage("run STEPS [SEED]")),
            ["state", id] => ShellCommand::State(id.to_string()),
            ["state", ..] => return Err(ShellError::Usage("state ID")),
            ["show"] => ShellCommand::Show,
            ["check"] => ShellCommand::Check,
            ["diag"] => ShellCommand::Diagnose,
            ["dot"] => ShellCommand::Dot(None),
            ["dot", path] => ShellCommand::Dot(Some(path.to_string())),
            ["reset"] => ShellCommand::Reset,
            ["help"] => ShellCommand::Help,
            ["quit"] | ["exit"] => ShellCommand::Quit,
            [other, ..] => return Err(ShellError::UnknownCommand(other.to_string())),
            [] => return Ok(None),
        };
        Ok(Some(command))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(Vec<String>),
    Quit,
}

pub struct Shell {
    net: Net,
    recorder: EventRecorder,
    config: PnConfig,
}

impl Shell {
    pub fn new(config: PnConfig) -> Self {
        let mut net = Net::new();
        let recorder = EventRecorder::new();
        net.subscribe(recorder.clone());
        Self {
            net,
            recorder,
            config,
        }
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    /// Applies one command and returns the lines to print, events included.
    pub fn execute(&mut self, command: ShellCommand) -> Result<Outcome, ShellError> {
        let mut lines = Vec::new();
        match command {
            ShellCommand::Place { x, y, id } => self.net.add_place(x, y, &id)?,
            ShellCommand::Transition { x, y, id } => self.net.add_transition(x, y, &id)?,
            ShellCommand::Arc { source, target, id } => self.net.add_arc(&source, &target, &id)?,
            ShellCommand::RemoveNode(id) => {
                if !self.net.remove_node(&id) {
                    lines.push(format!("no node {}", id));
                }
            }
            ShellCommand::RemoveArc(id) => {
                if !self.net.remove_arc(&id) {
                    lines.push(format!("no arc {}", id));
                }
            }
            ShellCommand::Name { id, name } => self.net.change_name(&id, &name)?,
            ShellCommand::Move { id, x, y } => self.net.change_position(&id, x, y)?,
            ShellCommand::Tokens { id, count } => self.net.change_tokens(&id, count)?,
            ShellCommand::Fire(id) => self.net.perform_transition(&id)?,
            ShellCommand::Unfire(id) => self.net.inverse_transition(&id)?,
            ShellCommand::Run { steps, seed } => lines.extend(self.run_random(steps, seed)?),
            ShellCommand::State(id) => lines.push(self.describe(&id)?),
            ShellCommand::Show => {
                for id in self.net.node_ids() {
                    lines.push(self.describe(id.as_str())?);
                }
                for arc in self.net.arcs() {
                    lines.push(format!("{}: {} -> {}", arc.id(), arc.source(), arc.target()));
                }
            }
            ShellCommand::Check => {
                let broken = self.net.verify_enablement();
                if broken.is_empty() {
                    lines.push("ok".to_string());
                } else {
                    lines.push(format!("inconsistent: {}", broken.iter().join(", ")));
                }
            }
            ShellCommand::Diagnose => {
                let report = self.net.log_diagnostics();
                lines.push(format!(
                    "{} places, {} transitions",
                    report.total_places, report.total_transitions
                ));
                if !report.isolated_places.is_empty() {
                    lines.push(format!(
                        "isolated places: {}",
                        report.isolated_places.iter().join(", ")
                    ));
                }
                if !report.isolated_transitions.is_empty() {
                    lines.push(format!(
                        "isolated transitions: {}",
                        report.isolated_transitions.iter().join(", ")
                    ));
                }
                if !report.source_transitions.is_empty() {
                    lines.push(format!(
                        "always enabled: {}",
                        report.source_transitions.iter().join(", ")
                    ));
                }
            }
            ShellCommand::Dot(None) => lines.push(self.net.to_dot()),
            ShellCommand::Dot(Some(path)) => {
                self.net
                    .write_dot(&path)
                    .map_err(|source| ShellError::Io { path, source })?;
            }
            ShellCommand::Reset => self.net.reinitialize(),
            ShellCommand::Help => lines.push(HELP.to_string()),
            ShellCommand::Quit => return Ok(Outcome::Quit),
        }

        let mut output = self.drain_events();
        output.extend(lines);
        if self.config.check_after_each {
            let broken = self.net.verify_enablement();
            if !broken.is_empty() {
                log::error!("enablement out of sync: {:?}", broken);
                output.push(format!("inconsistent: {}", broken.iter().join(", ")));
            }
        }
        Ok(Outcome::Continue(output))
    }

    fn run_random(&mut self, steps: usize, seed: Option<u64>) -> Result<Vec<String>, ShellError> {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut lines = vec![format!("seed {}", seed)];
        for step in 0..steps {
            let enabled = self.net.enabled_transitions();
            if enabled.is_empty() {
                lines.push(format!("dead after {} steps", step));
                return Ok(lines);
            }
            let chosen = &enabled[rng.random_range(0..enabled.len())];
            self.net.perform_transition(chosen.as_str())?;
            lines.push(format!("fired {}", chosen));
        }
        Ok(lines)
    }

    fn describe(&self, id: &str) -> Result<String, NetError> {
        let node = self.net.node(id)?;
        let name = if node.name().is_empty() {
            String::new()
        } else {
            format!(" \"{}\"", node.name())
        };
        let state = match node.kind() {
            NodeKind::Place { tokens } => format!("place tokens={}", tokens),
            NodeKind::Transition { enabled } => format!(
                "transition {}",
                if *enabled { "enabled" } else { "disabled" }
            ),
        };
        Ok(format!("{}{} {} {}", node.id(), name, node.position(), state))
    }

    fn drain_events(&self) -> Vec<String> {
        let events = self.recorder.take();
        if !self.config.echo_events {
            return Vec::new();
        }
        events
            .iter()
            .filter_map(|event| self.render_event(event))
            .collect()
    }

    fn render_event(&self, event: &NetEvent) -> Option<String> {
        if self.config.json_events {
            return match serde_json::to_string(event) {
                Ok(line) => Some(line),
                Err(err) => {
                    log::warn!("事件 {:?} 无法序列化: {}", event, err);
                    None
                }
            };
        }
        Some(match event {
            NetEvent::TransitionStateChanged { id, enabled } => format!(
                "~ {} {}",
                id,
                if *enabled { "enabled" } else { "disabled" }
            ),
            NetEvent::TokensChanged { id, tokens } => format!("~ {} tokens={}", id, tokens),
        })
    }

    /// Reads commands until end of input or `quit`. Failed commands are reported and skipped.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W, interactive: bool) -> Result<()> {
        if interactive {
            write!(out, "{}", self.config.prompt)?;
            out.flush()?;
        }
        for line in input.lines() {
            let line = line?;
            let outcome = ShellCommand::parse(&line).and_then(|command| match command {
                Some(command) => self.execute(command),
                None => Ok(Outcome::Continue(Vec::new())),
            });
            match outcome {
                Ok(Outcome::Continue(lines)) => {
                    for line in lines {
                        writeln!(out, "{}", line)?;
                    }
                }
                Ok(Outcome::Quit) => break,
                Err(err) => {
                    log::debug!("command `{}` failed: {:?}", line, err);
                    writeln!(out, "error: {}", err)?;
                }
            }
            if interactive {
                write!(out, "{}", self.config.prompt)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    /// Writes the final DOT dump if one is configured.
    pub fn finish(&self) -> Result<()> {
        if let Some(path) = &self.config.dot_on_exit {
            self.net.write_dot(path)?;
            log::info!("net written to {:?}", path);
        }
        Ok(())
    }
}
