//! CLI commands
//!
//! Reserved words typed at the prompt. Anything else is sent to the agent.

/// Result of parsing a line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Send as the next user message
    Continue(String),
    /// Keep the agent and thread after exit
    Save,
    /// End the session
    Exit,
    /// Nothing to do
    None,
}

/// Parse one input line
pub fn parse_command(input: &str) -> CommandResult {
    let line = input.trim_end_matches(['\r', '\n']);
    let word = line.trim();

    if word.is_empty() {
        CommandResult::None
    } else if word.eq_ignore_ascii_case("exit") {
        CommandResult::Exit
    } else if word.eq_ignore_ascii_case("save") {
        CommandResult::Save
    } else {
        CommandResult::Continue(line.to_string())
    }
}
