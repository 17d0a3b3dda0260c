//! Terminal front end helpers: input commands and transcript rendering.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::attachment::expand_home;
use crate::session::{ChatController, Entry, Role};

/// Indicator shown while a request is in flight.
pub const TYPING_INDICATOR: &str = "AI is typing...";

pub const HELP: &str = "\
Type a message and press Enter to send.
  /attach <path>   attach a .pdf, .docx, .txt or .md file to the next message
  /detach          remove the attached file
  /history         reprint the conversation
  /health          check that the backend is reachable
  /help            show this help
  /quit            exit
Ctrl-C cancels a reply that is still streaming.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the line as the message (may be empty when a file is attached).
    Submit(String),
    Attach(PathBuf),
    Detach,
    History,
    Health,
    Help,
    Quit,
    /// A `/word` we do not know.
    Unknown(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Submit(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "attach" if !arg.is_empty() => Command::Attach(expand_home(arg)),
        "detach" => Command::Detach,
        "history" => Command::History,
        "health" => Command::Health,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Prompt prefix printed before an assistant reply starts streaming.
pub fn reply_prefix() -> String {
    format!("{}> ", role_label(Role::Assistant))
}

/// Write one streamed fragment. The first one clears the typing indicator
/// and starts the reply line.
pub fn write_fragment<W: Write>(out: &mut W, first: bool, text: &str) -> io::Result<()> {
    if first {
        write!(out, "\r\x1b[2K{}", reply_prefix())?;
    }
    write!(out, "{text}")?;
    out.flush()
}

/// Render one transcript entry, with an inline file preview if present.
pub fn render_entry(entry: &Entry) -> String {
    let mut out = String::new();
    if let Some(name) = &entry.attached_file_name {
        out.push_str(&format!("  [file: {name}]\n"));
    }
    out.push_str(&format!("{}> {}", role_label(entry.role), entry.content));
    out
}

/// Render the whole transcript plus any pending attachment and error.
pub fn render_session(chat: &ChatController) -> String {
    let mut lines: Vec<String> = chat.transcript().iter().map(render_entry).collect();
    if chat.is_loading() {
        lines.push(TYPING_INDICATOR.to_string());
    }
    if let Some(attachment) = &chat.draft().attachment {
        lines.push(format!("  [attached: {}]", attachment.file_name()));
    }
    if let Some(error) = chat.error() {
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Attachment;

    #[test]
    fn test_plain_text_is_submitted() {
        assert_eq!(parse_command("Hello\n"), Command::Submit("Hello".into()));
        assert_eq!(parse_command(""), Command::Submit(String::new()));
        assert_eq!(
            parse_command("  keep leading space"),
            Command::Submit("  keep leading space".into())
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_command("/attach docs/report.pdf"),
            Command::Attach(PathBuf::from("docs/report.pdf"))
        );
        assert_eq!(parse_command("/detach"), Command::Detach);
        assert_eq!(parse_command(" /quit "), Command::Quit);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("/health"), Command::Health);
        assert_eq!(parse_command("/history"), Command::History);
        assert_eq!(parse_command("/?"), Command::Help);
        assert_eq!(parse_command("/attach"), Command::Unknown("/attach".into()));
        assert_eq!(parse_command("/nope x"), Command::Unknown("/nope x".into()));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_fragment_replaces_indicator_once() {
        let mut out = Vec::new();
        write_fragment(&mut out, true, "Hi").unwrap();
        write_fragment(&mut out, false, " there").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\r\x1b[2Kassistant> Hi there");
    }

    #[test]
    fn test_write_fragment_reports_write_errors() {
        let err = write_fragment(&mut ClosedPipe, false, "lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_render_entry_with_file() {
        let entry = Entry::user("summarize", Some("brief.docx".into()));
        assert_eq!(render_entry(&entry), "  [file: brief.docx]\nyou> summarize");
        assert_eq!(render_entry(&Entry::assistant("ok")), "assistant> ok");
    }

    #[test]
    fn test_render_session_shows_indicator_and_attachment() {
        let mut chat = ChatController::new();
        chat.attach(Attachment::from_bytes("a.txt", b"x".to_vec()))
            .unwrap();
        assert!(render_session(&chat).contains("[attached: a.txt]"));

        chat.set_draft("hi").unwrap();
        chat.begin_submit().unwrap();
        let rendered = render_session(&chat);
        assert!(rendered.starts_with("  [file: a.txt]\nyou> hi"));
        assert!(rendered.contains(TYPING_INDICATOR));
    }
}
