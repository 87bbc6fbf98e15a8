//! Interactive REPL for the sales agent
//!
//! Starts a session, forwards each line to the agent and cleans up on exit.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::{CleanupReport, RunOrchestrator, Session, SessionManager, TerminalOutcome};
use crate::backend::AgentBackend;
use crate::cli::commands::{parse_command, CommandResult};
use crate::core::{Config, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    backend: Arc<dyn AgentBackend>,
}

impl Repl {
    pub fn new(config: Config, backend: Arc<dyn AgentBackend>) -> Self {
        Self { config, backend }
    }

    /// Run the REPL
    ///
    /// Setup errors are returned before the loop starts. Errors inside a
    /// turn are printed and the loop continues.
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Creating agent...");
        io::stdout().flush()?;

        let manager = SessionManager::new(self.backend.clone());
        let (session, tools) = manager.start(&self.config).await?;
        println!(" Ready!\n");

        let mut orchestrator =
            RunOrchestrator::from_config(self.backend.clone(), session, tools, &self.config)
                .with_token_callback(Box::new(|text| {
                    print!("{}", text);
                    let _ = io::stdout().flush();
                }));

        let mut persist = false;
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("Enter your query (type exit or save to finish): ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!();
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            match parse_command(&input) {
                CommandResult::Exit => break,
                CommandResult::None => continue,
                CommandResult::Save => {
                    persist = true;
                    print_kept(orchestrator.session());
                }
                CommandResult::Continue(prompt) => {
                    println!();
                    match orchestrator.run_turn(&prompt).await {
                        Ok(outcome) => print_outcome(&outcome, true),
                        Err(e) => eprintln!("\nError: {}\n", e),
                    }
                }
            }
        }

        let report = manager.end(orchestrator.session(), persist).await;
        print_cleanup(&report);
        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!();
        println!("Contoso Sales Agent");
        println!("───────────────────────────────────────────");
        println!("Lab:        {}", self.config.agent.lab);
        println!("Model:      {}", self.config.model.deployment);
        println!("Endpoint:   {}", self.config.backend.endpoint);
        println!("Shared dir: {}", self.config.paths.shared_dir.display());
        println!();
        println!("Commands: save (keep agent and thread), exit");
        println!("───────────────────────────────────────────");
    }
}

/// Start a session, answer one prompt and end the session
pub async fn run_once(
    config: &Config,
    backend: Arc<dyn AgentBackend>,
    prompt: &str,
    keep: bool,
) -> Result<()> {
    let manager = SessionManager::new(backend.clone());
    let (session, tools) = manager.start(config).await?;

    let mut orchestrator = RunOrchestrator::from_config(backend, session, tools, config);
    let result = orchestrator.run_turn(prompt).await;

    if keep {
        print_kept(orchestrator.session());
    }
    let report = manager.end(orchestrator.session(), keep).await;
    print_cleanup(&report);

    let outcome = result?;
    print_outcome(&outcome, false);
    Ok(())
}

fn print_outcome(outcome: &TerminalOutcome, streamed: bool) {
    match outcome {
        TerminalOutcome::Completed { text, artifacts } => {
            if streamed {
                println!("\n");
            } else {
                println!("{}\n", text);
            }
            for path in artifacts {
                println!("Saved file: {}", path.display());
            }
        }
        TerminalOutcome::Failed { code, message } => {
            eprintln!("\nRun failed ({}): {}\n", code, message);
        }
        TerminalOutcome::RateLimited { message } => {
            eprintln!("\nRate limit exceeded, try again in a moment: {}\n", message);
        }
    }
}

fn print_kept(session: &Session) {
    println!(
        "Session will be kept. Agent: {}  Thread: {}\n",
        session.agent_id, session.thread_id
    );
}

fn print_cleanup(report: &CleanupReport) {
    if report.persisted {
        return;
    }
    if report.is_clean() {
        println!("Deleted agent and thread.");
    } else {
        for failure in &report.failures {
            eprintln!("Cleanup failed for {}", failure);
        }
    }
}
