//! fpl-cli — terminal front-end for the FPL assistant
//!
//! Talks to `fpl-server` over its Unix socket and renders the chat log with the
//! active theme palette.
//!
//! # Subcommands
//! - `chat`                                  — interactive chat loop
//! - `send <text> [--image URI] [--json]`    — send one message and print the reply
//! - `history [--json]`                      — print the session log
//! - `clear`                                 — reset the session to the greeting
//! - `status`                                — show session status
//! - `profile`                               — show the profile screen

mod client;

use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use fpl_core::ipc::{AssistantRequest, DEFAULT_SESSION};
use fpl_core::theme::hex_to_rgb;
use fpl_core::{
    AnalysisStatus, ImagePickerResult, Message, MessageId, Palette, ThemeContext, ThemeMode,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use client::IpcClient;

const DEFAULT_SOCKET: &str = "/tmp/fpl-assistant.sock";
/// Input box limit carried over from the mobile chat screen.
const MAX_INPUT_CHARS: usize = 500;
const POLL_INTERVAL: Duration = Duration::from_millis(150);

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "fpl-cli", version, about = "FPL assistant — terminal chat front-end")]
struct Cli {
    /// Server socket path
    #[arg(long, env = "FPL_SOCKET", default_value = DEFAULT_SOCKET)]
    socket: PathBuf,

    /// Session key on the server
    #[arg(long, env = "FPL_SESSION", default_value = DEFAULT_SESSION)]
    session: String,

    /// Theme mode: light, dark or system
    #[arg(long, env = "FPL_THEME", default_value = "system")]
    theme: ThemeMode,

    /// Treat the host appearance as dark when the theme mode is `system`
    #[arg(long, env = "FPL_SYSTEM_DARK")]
    system_dark: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive chat
    Chat,

    /// Send a single message
    Send {
        /// Message text
        #[arg(default_value = "")]
        text: String,

        /// Attach an image (screenshot of your team)
        #[arg(long)]
        image: Option<String>,

        /// Image width in pixels
        #[arg(long, requires = "image")]
        width: Option<u32>,

        /// Image height in pixels
        #[arg(long, requires = "image")]
        height: Option<u32>,

        /// Return as soon as the message is accepted
        #[arg(long)]
        no_wait: bool,

        /// Print the raw server response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the session log
    History {
        #[arg(long)]
        json: bool,
    },

    /// Reset the session to the greeting
    Clear,

    /// Show session status
    Status,

    /// Show the profile screen
    Profile,
}

// ============================================================================
// Rendering
// ============================================================================

fn paint(text: &str, hex: &str) -> ColoredString {
    match hex_to_rgb(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn truncate_input(input: &str) -> String {
    input.chars().take(MAX_INPUT_CHARS).collect()
}

/// One chat bubble as terminal lines.
fn render_message(message: &Message, palette: &Palette) -> String {
    let time = message.timestamp.format("%H:%M").to_string();
    let (name, colour) = if message.is_user() {
        ("You", palette.primary)
    } else {
        ("FPL Assistant", palette.accent)
    };

    let mut out = format!(
        "{} {}",
        paint(&format!("[{}]", time), palette.text_secondary),
        paint(&format!("{}:", name), colour).bold()
    );

    let mut lines = message.text.lines();
    if let Some(first) = lines.next() {
        out.push(' ');
        out.push_str(&paint(first, palette.text).to_string());
    }
    for line in lines {
        out.push_str("\n        ");
        out.push_str(&paint(line, palette.text).to_string());
    }

    if let Some(image) = &message.image {
        let dims = match (image.width, image.height) {
            (Some(w), Some(h)) => format!(" ({}x{})", w, h),
            _ => String::new(),
        };
        out.push_str("\n        ");
        let label = format!("[image: {}{}]", image.uri, dims);
        out.push_str(&paint(&label, palette.highlight).to_string());
    }

    match message.analysis {
        Some(AnalysisStatus::Pending) => {
            out.push_str("\n        ");
            out.push_str(&paint("Analyzing team...", palette.secondary).italic().to_string());
        }
        Some(AnalysisStatus::Failed) => {
            out.push_str("\n        ");
            out.push_str(&paint("[analysis failed]", palette.secondary).to_string());
        }
        Some(AnalysisStatus::Complete) | None => {}
    }

    out
}

fn render_typing(palette: &Palette) -> String {
    paint("FPL Assistant is typing...", palette.text_secondary)
        .italic()
        .to_string()
}

fn render_profile(theme: &ThemeContext) -> String {
    let palette = theme.palette();
    let mut out = String::new();
    out.push_str(&paint("FPL Manager", palette.text).bold().to_string());
    out.push('\n');
    out.push_str(&paint("Ready to dominate your league!", palette.text_secondary).to_string());
    out.push_str("\n\n");
    out.push_str(&paint("Appearance", palette.text).bold().to_string());
    out.push('\n');
    for mode in [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System] {
        let label = format!("{:<8}", mode.to_string());
        if mode == theme.mode() {
            out.push_str(&format!("  (*) {}\n", paint(&label, palette.primary).bold()));
        } else {
            out.push_str(&format!("  ( ) {}\n", paint(&label, palette.text)));
        }
    }
    out.push_str(&format!(
        "\nActive palette: {}",
        if theme.is_dark() { "dark" } else { "light" }
    ));
    out
}

/// Tracks what has been printed so updates print only new or changed bubbles.
#[derive(Default)]
struct Transcript {
    seen: HashMap<MessageId, Message>,
}

impl Transcript {
    fn reset(&mut self) {
        self.seen.clear();
    }

    /// Messages that are new or changed since the last call, in log order.
    fn diff(&mut self, messages: Vec<Message>) -> Vec<Message> {
        let mut fresh = Vec::new();
        for message in messages {
            if self.seen.get(&message.id) != Some(&message) {
                self.seen.insert(message.id, message.clone());
                fresh.push(message);
            }
        }
        fresh
    }
}

fn parse_messages(value: &serde_json::Value) -> anyhow::Result<Vec<Message>> {
    match value.get("messages") {
        Some(messages) => Ok(serde_json::from_value(messages.clone())?),
        None => Ok(Vec::new()),
    }
}

// ============================================================================
// Commands
// ============================================================================

struct Frontend {
    client: IpcClient,
    session: String,
    theme: ThemeContext,
    transcript: Transcript,
}

impl Frontend {
    fn session(&self) -> Option<String> {
        Some(self.session.clone())
    }

    fn print_messages(&mut self, messages: Vec<Message>) {
        let palette = self.theme.palette();
        for message in self.transcript.diff(messages) {
            println!("{}", render_message(&message, palette));
        }
    }

    async fn history(&mut self) -> anyhow::Result<serde_json::Value> {
        let request = AssistantRequest::History {
            session: self.session(),
        };
        self.client.request(&request).await
    }

    async fn refresh(&mut self) -> anyhow::Result<()> {
        let data = self.history().await?;
        self.print_messages(parse_messages(&data)?);
        Ok(())
    }

    /// Send without waiting, print the user bubble, then poll until the reply lands.
    async fn send_and_follow(
        &mut self,
        text: &str,
        image: Option<ImagePickerResult>,
    ) -> anyhow::Result<()> {
        let request = AssistantRequest::Send {
            session: self.session(),
            text: truncate_input(text),
            image,
            wait: false,
        };
        let data = self.client.request(&request).await?;
        if data["accepted"] != true {
            return Ok(());
        }
        self.print_messages(parse_messages(&data)?);
        println!("{}", render_typing(self.theme.palette()));

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let data = self.history().await?;
            if data["composing"] != true {
                self.print_messages(parse_messages(&data)?);
                return Ok(());
            }
        }
    }

    async fn clear(&mut self) -> anyhow::Result<()> {
        let request = AssistantRequest::Clear {
            session: self.session(),
        };
        let data = self.client.request(&request).await?;
        self.transcript.reset();
        self.print_messages(parse_messages(&data)?);
        Ok(())
    }
}

enum ChatCommand {
    Quit,
    Clear,
    History,
    Profile,
    Theme(String),
    Image { uri: String, text: String },
    Say(String),
}

fn parse_chat_line(line: &str) -> ChatCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Say(line.to_string());
    };
    let (cmd, args) = match rest.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (rest, ""),
    };
    match cmd {
        "quit" | "exit" => ChatCommand::Quit,
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "profile" => ChatCommand::Profile,
        "theme" => ChatCommand::Theme(args.to_string()),
        "image" => {
            let (uri, text) = match args.split_once(char::is_whitespace) {
                Some((uri, text)) => (uri, text.trim()),
                None => (args, ""),
            };
            ChatCommand::Image {
                uri: uri.to_string(),
                text: text.to_string(),
            }
        }
        _ => ChatCommand::Say(line.to_string()),
    }
}

async fn do_chat(frontend: &mut Frontend) -> anyhow::Result<()> {
    println!(
        "{}",
        paint("FPL Assistant", frontend.theme.palette().primary).bold()
    );
    println!("Commands: /image <uri> [text], /clear, /history, /theme <mode>, /profile, /quit\n");
    frontend.refresh().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_chat_line(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Clear => frontend.clear().await?,
            ChatCommand::History => {
                frontend.transcript.reset();
                frontend.refresh().await?;
            }
            ChatCommand::Profile => println!("{}\n", render_profile(&frontend.theme)),
            ChatCommand::Theme(mode) => match mode.parse::<ThemeMode>() {
                Ok(mode) => {
                    frontend.theme.set_mode(mode);
                    println!("Theme set to {}", mode);
                }
                Err(e) => eprintln!("{}", e),
            },
            ChatCommand::Image { uri, text } => {
                if uri.is_empty() {
                    eprintln!("usage: /image <uri> [text]");
                    continue;
                }
                let image = ImagePickerResult {
                    uri,
                    width: None,
                    height: None,
                    file_size: None,
                    file_name: None,
                };
                if let Err(e) = frontend.send_and_follow(&text, Some(image)).await {
                    eprintln!("fpl-cli: {}", e);
                }
            }
            ChatCommand::Say(text) => {
                if let Err(e) = frontend.send_and_follow(&text, None).await {
                    eprintln!("fpl-cli: {}", e);
                }
            }
        }
    }
    Ok(())
}

async fn do_send(
    frontend: &mut Frontend,
    text: String,
    image: Option<ImagePickerResult>,
    no_wait: bool,
    json: bool,
) -> anyhow::Result<()> {
    let request = AssistantRequest::Send {
        session: frontend.session(),
        text: truncate_input(&text),
        image,
        wait: !no_wait,
    };
    let data = frontend.client.request(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if data["accepted"] != true {
        eprintln!("Nothing to send: message is empty");
        return Ok(());
    }

    let mut messages = parse_messages(&data)?;
    if let Some(reply) = data.get("reply").and_then(|r| r.get("message")) {
        messages.push(serde_json::from_value(reply.clone())?);
    }
    frontend.print_messages(messages);
    Ok(())
}

async fn do_history(frontend: &mut Frontend, json: bool) -> anyhow::Result<()> {
    let data = frontend.history().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    frontend.print_messages(parse_messages(&data)?);
    if data["composing"] == true {
        println!("{}", render_typing(frontend.theme.palette()));
    }
    Ok(())
}

async fn do_status(frontend: &mut Frontend) -> anyhow::Result<()> {
    let request = AssistantRequest::Status {
        session: frontend.session(),
    };
    let data = frontend.client.request(&request).await?;
    println!("Session:    {}", data["session"].as_str().unwrap_or("?"));
    println!("Session id: {}", data["session_id"].as_str().unwrap_or("?"));
    println!("Messages:   {}", data["message_count"]);
    println!("Composing:  {}", data["composing"]);
    println!("Revision:   {}", data["revision"]);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

async fn run(cli: Cli) -> anyhow::Result<()> {
    let theme = ThemeContext::new(cli.theme, cli.system_dark);

    if let Commands::Profile = cli.command {
        println!("{}", render_profile(&theme));
        return Ok(());
    }

    let client = IpcClient::connect(&cli.socket).await?;
    let mut frontend = Frontend {
        client,
        session: cli.session,
        theme,
        transcript: Transcript::default(),
    };

    match cli.command {
        Commands::Chat => do_chat(&mut frontend).await,
        Commands::Send {
            text,
            image,
            width,
            height,
            no_wait,
            json,
        } => {
            let image = image.map(|uri| ImagePickerResult {
                uri,
                width,
                height,
                file_size: None,
                file_name: None,
            });
            do_send(&mut frontend, text, image, no_wait, json).await
        }
        Commands::History { json } => do_history(&mut frontend, json).await,
        Commands::Clear => frontend.clear().await,
        Commands::Status => do_status(&mut frontend).await,
        Commands::Profile => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("fpl-cli: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fpl_core::ImageRef;

    fn plain() {
        colored::control::set_override(false);
    }

    fn bot(id: u64, text: &str) -> Message {
        Message::bot(MessageId(id), text)
    }

    #[test]
    fn test_render_user_message_with_image() {
        plain();
        let message = Message::user(
            MessageId(2),
            "rate my team",
            Some(ImageRef::new("file:///team.png").with_dimensions(640, 480)),
        );

        let rendered = render_message(&message, &fpl_core::theme::LIGHT_PALETTE);
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[0].ends_with("You: rate my team"), "{}", lines[0]);
        assert_eq!(lines[1].trim(), "[image: file:///team.png (640x480)]");
    }

    #[test]
    fn test_render_multiline_bot_message_indents() {
        plain();
        let message = bot(3, "Line one\nLine two");
        let rendered = render_message(&message, &fpl_core::theme::DARK_PALETTE);
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[0].ends_with("FPL Assistant: Line one"));
        assert_eq!(lines[1], "        Line two");
    }

    #[test]
    fn test_render_pending_analysis() {
        plain();
        let mut message = bot(4, "Analyzing your team...");
        message.analysis = Some(AnalysisStatus::Pending);
        let rendered = render_message(&message, &fpl_core::theme::LIGHT_PALETTE);
        assert!(rendered.contains("Analyzing team..."));
    }

    #[test]
    fn test_transcript_reports_new_and_changed() {
        let mut transcript = Transcript::default();
        let greeting = bot(1, "hello");
        let mut pending = bot(2, "Analyzing your team...");
        pending.analysis = Some(AnalysisStatus::Pending);

        let first = transcript.diff(vec![greeting.clone(), pending.clone()]);
        assert_eq!(first.len(), 2);

        let again = transcript.diff(vec![greeting.clone(), pending.clone()]);
        assert!(again.is_empty());

        let mut done = pending;
        done.text = "Squad review".to_string();
        done.analysis = Some(AnalysisStatus::Complete);
        let changed = transcript.diff(vec![greeting.clone(), done.clone()]);
        assert_eq!(changed, vec![done]);

        transcript.reset();
        assert_eq!(transcript.diff(vec![greeting]).len(), 1);
    }

    #[test]
    fn test_parse_chat_line() {
        assert!(matches!(parse_chat_line("/quit"), ChatCommand::Quit));
        assert!(matches!(parse_chat_line("  /clear "), ChatCommand::Clear));
        assert!(matches!(parse_chat_line("/theme dark"), ChatCommand::Theme(m) if m == "dark"));
        match parse_chat_line("/image file:///t.png who should I sell?") {
            ChatCommand::Image { uri, text } => {
                assert_eq!(uri, "file:///t.png");
                assert_eq!(text, "who should I sell?");
            }
            _ => panic!("expected image command"),
        }
        assert!(matches!(parse_chat_line("/image"), ChatCommand::Image { uri, .. } if uri.is_empty()));
        assert!(matches!(parse_chat_line("captain?"), ChatCommand::Say(t) if t == "captain?"));
        assert!(matches!(parse_chat_line("/unknown thing"), ChatCommand::Say(t) if t == "/unknown thing"));
    }

    #[test]
    fn test_truncate_input_limits_chars() {
        let long = "é".repeat(600);
        assert_eq!(truncate_input(&long).chars().count(), MAX_INPUT_CHARS);
        assert_eq!(truncate_input("short"), "short");
    }

    #[test]
    fn test_profile_marks_active_mode() {
        plain();
        let theme = ThemeContext::new(ThemeMode::Dark, false);
        let rendered = render_profile(&theme);
        assert!(rendered.contains("(*) dark"));
        assert!(rendered.contains("( ) light"));
        assert!(rendered.ends_with("Active palette: dark"));
    }

    #[test]
    fn test_cli_parses_send_with_image() {
        let cli = Cli::try_parse_from([
            "fpl-cli",
            "--theme",
            "dark",
            "send",
            "analyze",
            "--image",
            "file:///t.png",
            "--width",
            "100",
            "--height",
            "200",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.theme, ThemeMode::Dark);
        match cli.command {
            Commands::Send { text, image, width, height, json, no_wait } => {
                assert_eq!(text, "analyze");
                assert_eq!(image.as_deref(), Some("file:///t.png"));
                assert_eq!((width, height), (Some(100), Some(200)));
                assert!(json);
                assert!(!no_wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
