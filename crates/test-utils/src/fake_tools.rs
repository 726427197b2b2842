use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use assetdag::exec::{ToolInvocation, ToolLine, ToolOutput, ToolProcess, ToolRunner};
use tokio::sync::mpsc;

/// Scripted reply for a tool.
#[derive(Debug, Clone)]
pub enum ToolReply {
    Output(ToolOutput),
    /// The process could not be started.
    SpawnError(String),
    /// Lines a long-running tool prints. The stream stays open after the
    /// last line unless that line is [`ToolLine::Exited`].
    Stream(Vec<ToolLine>),
}

/// A tool runner that records every invocation and never starts a process.
///
/// Replies are keyed by the first argument when present (`postcss`,
/// `webpack`, `eslint`), otherwise by the program name, and default to a
/// successful empty output.
#[derive(Clone, Default)]
pub struct FakeToolRunner {
    invocations: Arc<Mutex<Vec<ToolInvocation>>>,
    replies: Arc<Mutex<HashMap<String, ToolReply>>>,
    open_streams: Arc<Mutex<Vec<mpsc::UnboundedSender<ToolLine>>>>,
}

impl FakeToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, key: &str, reply: ToolReply) -> Self {
        self.replies.lock().unwrap().insert(key.to_string(), reply);
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// `program` or `program first-arg`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|inv| match inv.args.first() {
                Some(first) => format!("{} {}", inv.program, first),
                None => inv.program.clone(),
            })
            .collect()
    }

    fn record(&self, invocation: ToolInvocation) -> Option<ToolReply> {
        let key = Self::key_of(&invocation);
        let reply = {
            let replies = self.replies.lock().unwrap();
            replies
                .get(&key)
                .or_else(|| replies.get(&invocation.program))
                .cloned()
        };
        self.invocations.lock().unwrap().push(invocation);
        reply
    }

    fn stream(&self, lines: Vec<ToolLine>) -> ToolProcess {
        let (tx, rx) = mpsc::unbounded_channel();
        let exits = matches!(lines.last(), Some(ToolLine::Exited(_)));
        for line in lines {
            let _ = tx.send(line);
        }
        if !exits {
            self.open_streams.lock().unwrap().push(tx);
        }
        ToolProcess::new(rx, None)
    }

    fn key_of(invocation: &ToolInvocation) -> String {
        invocation
            .args
            .first()
            .cloned()
            .unwrap_or_else(|| invocation.program.clone())
    }
}

impl ToolRunner for FakeToolRunner {
    fn run(
        &self,
        invocation: ToolInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + '_>> {
        Box::pin(async move {
            match self.record(invocation) {
                None | Some(ToolReply::Stream(_)) => Ok(ToolOutput::success()),
                Some(ToolReply::Output(out)) => Ok(out),
                Some(ToolReply::SpawnError(msg)) => Err(anyhow!(msg)),
            }
        })
    }

    fn spawn(
        &self,
        invocation: ToolInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ToolProcess>> + Send + '_>> {
        Box::pin(async move {
            match self.record(invocation) {
                None => Ok(self.stream(Vec::new())),
                Some(ToolReply::Stream(lines)) => Ok(self.stream(lines)),
                Some(ToolReply::Output(out)) => {
                    let mut lines: Vec<ToolLine> =
                        out.stdout.lines().map(|l| ToolLine::Stdout(l.to_string())).collect();
                    lines.extend(out.stderr.lines().map(|l| ToolLine::Stderr(l.to_string())));
                    lines.push(ToolLine::Exited(out.exit));
                    Ok(self.stream(lines))
                }
                Some(ToolReply::SpawnError(msg)) => Err(anyhow!(msg)),
            }
        })
    }
}
