//! Interactive console front end
//!
//! Reads one question per line, runs it as a turn and prints each tool
//! result as `Observation: <value>` followed by the answer as `LLM: <text>`.
//! Turn failures go to the error stream and the prompt comes back; only end
//! of input stops the loop. Bytes that are not UTF-8 are replaced, not fatal.

use crate::llm::LlmService;
use crate::runtime::{AgentRuntime, TurnOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const PROMPT: &str = ">> ";

pub async fn run_repl<L, R, W, E>(
    runtime: &mut AgentRuntime<L>,
    mut input: R,
    mut out: W,
    mut err: E,
) -> std::io::Result<()>
where
    L: LlmService,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        out.write_all(PROMPT.as_bytes()).await?;
        out.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            tracing::debug!("End of input");
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let question = line.trim_end_matches(['\n', '\r']);
        if question.trim().is_empty() {
            continue;
        }

        let seen = runtime.conversation().observations().len();
        let outcome = runtime.run_turn(question).await;
        for observation in &runtime.conversation().observations()[seen..] {
            out.write_all(format!("Observation: {observation}\n").as_bytes())
                .await?;
        }

        match outcome {
            Ok(TurnOutcome::Answered(output)) => {
                out.write_all(format!("LLM: {output}\n").as_bytes()).await?;
            }
            Ok(TurnOutcome::Aborted(error)) => {
                err.write_all(format!("Error: {error}\n").as_bytes()).await?;
            }
            Err(error) => {
                tracing::error!(error = %error, "Turn rejected");
                err.write_all(format!("Error: {error}\n").as_bytes()).await?;
            }
        }
        out.flush().await?;
        err.flush().await?;
    }

    out.write_all(b"\n").await?;
    out.flush().await
}
