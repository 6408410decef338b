//! `ptg serve` command implementation.
//!
//! Reads one JSON request per line, evaluates each line on its own task and
//! funnels responses through a channel to a single writer. Responses may be
//! written out of order; clients correlate them by `requestId`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use ptg_policy::{DecisionRequest, PolicyError, PolicyService};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

use crate::settings::GlobalArgs;

/// Arguments for `ptg serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Maximum requests evaluated concurrently.
    #[arg(long, default_value_t = 256)]
    pub max_in_flight: usize,

    /// Worker threads for the runtime (defaults to the CPU count).
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Request operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    #[default]
    Decide,
    Stats,
    Debug,
    Reset,
}

/// Fields common to every request line.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    op: Op,
    #[serde(default)]
    request_id: Option<Value>,
}

/// Error body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn success(request_id: Option<Value>, result: Value) -> Self {
        Self {
            request_id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(request_id: Option<Value>, err: &PolicyError) -> Self {
        Self {
            request_id,
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }
}

/// Totals reported when the input stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServeSummary {
    pub requests: u64,
    pub responses: u64,
}

/// Run the serve command on stdin/stdout.
pub fn run(global: &GlobalArgs, args: &ServeArgs) -> Result<()> {
    let service = Arc::new(global.build_service()?);

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = args.workers {
        builder.worker_threads(workers.max(1));
    }
    let runtime = builder.build().context("failed to start runtime")?;

    let summary = runtime.block_on(serve_stream(
        service,
        tokio::io::stdin(),
        tokio::io::stdout(),
        args.max_in_flight,
    ))?;
    info!(
        requests = summary.requests,
        responses = summary.responses,
        "input closed, serve loop finished"
    );
    Ok(())
}

/// Evaluate one request line.
pub fn handle_line(service: &PolicyService, line: &str) -> Response {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return Response::failure(None, &PolicyError::InvalidRequest(e.to_string())),
    };
    let envelope = match Envelope::deserialize(&value) {
        Ok(envelope) => envelope,
        Err(e) => {
            let request_id = value.get("requestId").cloned();
            return Response::failure(request_id, &PolicyError::InvalidRequest(e.to_string()));
        }
    };

    let result = match envelope.op {
        Op::Decide => DecisionRequest::deserialize(&value)
            .map_err(|e| PolicyError::InvalidRequest(e.to_string()))
            .and_then(|request| service.decide(&request))
            .and_then(|decision| to_value(&decision)),
        Op::Stats => to_value(&service.stats()),
        Op::Debug => to_value(&service.debug()),
        Op::Reset => to_value(&service.reset()),
    };

    match result {
        Ok(result) => Response::success(envelope.request_id, result),
        Err(err) => Response::failure(envelope.request_id, &err),
    }
}

fn to_value<T: Serialize>(body: &T) -> Result<Value, PolicyError> {
    serde_json::to_value(body).map_err(|e| PolicyError::InvalidRequest(e.to_string()))
}

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// At most `max_in_flight` lines are evaluated concurrently. Returns once
/// every response has been written and flushed.
pub async fn serve_stream<R, W>(
    service: Arc<PolicyService>,
    reader: R,
    writer: W,
    max_in_flight: usize,
) -> Result<ServeSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Response>(max_in_flight.max(1));
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        let mut written = 0u64;
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            written += 1;
        }
        writer.flush().await?;
        anyhow::Ok(written)
    });

    let mut lines = BufReader::new(reader).lines();
    let mut requests = 0u64;
    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        requests += 1;

        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context("request limiter closed")?;
        let service = Arc::clone(&service);
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = handle_line(&service, &line);
            if !response.ok {
                debug!(error = ?response.error, "request failed");
            }
            if tx.send(response).await.is_err() {
                warn!("response writer closed; dropping response");
            }
            drop(permit);
        });
    }
    drop(tx);

    let responses = writer_task.await.context("response writer panicked")??;
    Ok(ServeSummary {
        requests,
        responses,
    })
}
