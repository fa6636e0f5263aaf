// ============================================================
// Layer 5 — Model Bridge (ProcessModel)
// ============================================================
// Production implementation of the GenerativeModel seam.
//
// The generator's architecture, pretrained weights, gradient
// storage, and optimizers live in an external model server
// process (typically the featurization/training side of the
// toolchain). This adapter launches that process and speaks a
// line-delimited JSON protocol over its stdin/stdout:
//
//   → {"op":"infer","batch":[...],"greedy":false,"seed":42}
//   ← {"ok":true,"infer":{"samples":[...],"aligned":false}}
//
// Every reply carries "ok"; a false reply surfaces the
// server-side error text as an anyhow error, which the
// pipeline then maps onto its per-stage fallbacks (skip
// example, neutral score, skip micro-batch).
//
// The protocol is strictly request/reply — one line out, one
// line in — so call ordering is preserved and nothing here is
// concurrent.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::candidate::{InferenceOutput, LossPair};
use crate::domain::complex::{Cdr, Complex};
use crate::domain::traits::{GenerativeModel, ParamGroup};

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    /// First message after launch; the reply must carry `cdr`.
    Handshake {
        pretrained_ckpt: &'a str,
        embedding_ckpt: &'a str,
        embedding_variant: &'a str,
        device: &'a str,
    },
    SetTraining {
        training: bool,
    },
    Infer {
        batch: &'a [Complex],
        greedy: bool,
        /// Sampling seed drawn from the run's seeded RNG
        seed: u64,
    },
    InitOptimizers {
        lr: f64,
    },
    ForwardBackward {
        batch: &'a [Complex],
        loss_scale: f64,
    },
    ClipGradNorm {
        group: &'static str,
        max_norm: f64,
    },
    OptimizerStep {
        group: &'static str,
    },
    ZeroGrad {
        group: &'static str,
    },
    SaveGroup {
        group: &'static str,
        path: &'a str,
    },
    Shutdown,
}

#[derive(Debug, Deserialize)]
struct Reply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    cdr: Option<Cdr>,
    #[serde(default)]
    infer: Option<InferenceOutput>,
    #[serde(default)]
    losses: Option<LossPair>,
}

fn parse_reply(line: &str) -> Result<Reply> {
    let reply: Reply =
        serde_json::from_str(line).with_context(|| format!("malformed model reply: {line}"))?;
    if !reply.ok {
        bail!(
            "model server error: {}",
            reply.error.as_deref().unwrap_or("unspecified")
        );
    }
    Ok(reply)
}

// ─── ProcessModel ─────────────────────────────────────────────────────────────

pub struct ProcessModel {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    cdr: Cdr,
}

/// Everything needed to launch and handshake the server.
pub struct ModelLaunch<'a> {
    /// Server command line; first token is the program
    pub command: &'a str,
    pub pretrained_ckpt: &'a str,
    pub embedding_ckpt: &'a str,
    pub embedding_variant: &'a str,
    pub device: &'a str,
}

impl ProcessModel {
    pub fn launch(launch: ModelLaunch<'_>) -> Result<Self> {
        let mut tokens = launch.command.split_whitespace();
        let program = tokens
            .next()
            .context("model command is empty")?;

        tracing::info!("Launching model server: {}", launch.command);
        let mut child = Command::new(program)
            .args(tokens)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("cannot launch model server '{program}'"))?;

        let stdin = BufWriter::new(child.stdin.take().context("model server has no stdin")?);
        let stdout = BufReader::new(child.stdout.take().context("model server has no stdout")?);
        let mut model = Self {
            child,
            stdin,
            stdout,
            // Placeholder until the handshake reply arrives
            cdr: Cdr::H3,
        };

        let reply = model.send(&Request::Handshake {
            pretrained_ckpt: launch.pretrained_ckpt,
            embedding_ckpt: launch.embedding_ckpt,
            embedding_variant: launch.embedding_variant,
            device: launch.device,
        })?;
        model.cdr = reply.cdr.context("handshake reply did not name a CDR")?;
        tracing::info!("Model server ready, redesigns {}", model.cdr);
        Ok(model)
    }

    fn send(&mut self, request: &Request<'_>) -> Result<Reply> {
        let line = serde_json::to_string(request)?;
        writeln!(self.stdin, "{line}").context("cannot write to model server")?;
        self.stdin.flush().context("cannot flush model server stdin")?;

        let mut reply_line = String::new();
        let n = self
            .stdout
            .read_line(&mut reply_line)
            .context("cannot read from model server")?;
        if n == 0 {
            bail!("model server closed its stdout");
        }
        parse_reply(reply_line.trim_end())
    }
}

impl GenerativeModel for ProcessModel {
    fn cdr(&self) -> Cdr {
        self.cdr
    }

    fn set_training(&mut self, training: bool) -> Result<()> {
        self.send(&Request::SetTraining { training })?;
        Ok(())
    }

    fn infer(
        &mut self,
        batch: &[Complex],
        greedy: bool,
        rng: &mut StdRng,
    ) -> Result<InferenceOutput> {
        let reply = self.send(&Request::Infer {
            batch,
            greedy,
            seed: rng.gen(),
        })?;
        reply.infer.context("infer reply carried no samples")
    }

    fn init_optimizers(&mut self, lr: f64) -> Result<()> {
        self.send(&Request::InitOptimizers { lr })?;
        Ok(())
    }

    fn forward_backward(&mut self, batch: &[Complex], loss_scale: f64) -> Result<LossPair> {
        let reply = self.send(&Request::ForwardBackward { batch, loss_scale })?;
        reply.losses.context("forward reply carried no losses")
    }

    fn clip_grad_norm(&mut self, group: ParamGroup, max_norm: f64) -> Result<()> {
        self.send(&Request::ClipGradNorm {
            group: group.as_str(),
            max_norm,
        })?;
        Ok(())
    }

    fn optimizer_step(&mut self, group: ParamGroup) -> Result<()> {
        self.send(&Request::OptimizerStep {
            group: group.as_str(),
        })?;
        Ok(())
    }

    fn zero_grad(&mut self, group: ParamGroup) -> Result<()> {
        self.send(&Request::ZeroGrad {
            group: group.as_str(),
        })?;
        Ok(())
    }

    fn save_group(&mut self, group: ParamGroup, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.send(&Request::SaveGroup {
            group: group.as_str(),
            path: &path,
        })?;
        Ok(())
    }
}

impl Drop for ProcessModel {
    fn drop(&mut self) {
        // Best-effort clean shutdown; the kill covers a server
        // that ignores the request.
        let _ = self.send(&Request::Shutdown);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
