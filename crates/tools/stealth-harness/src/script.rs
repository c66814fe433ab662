//! Harness script language
//!
//! One command per line, shell-style quoting, `#` starts a comment:
//!
//! ```text
//! dblclick masthead-date
//! type 1234
//! blur
//! wait 31000
//! event m1 "Ana Ruiz" "see you at the harbor"
//! open
//! ```

use anyhow::{anyhow, bail, Context};

/// One scripted host interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Click(String),
    DoubleClick(String),
    Type(String),
    Backspace,
    Submit(String),
    Cancel,
    Hide,
    Show,
    Blur,
    Focus,
    Activity,
    Unload,
    Event {
        id: String,
        sender: String,
        body: String,
    },
    /// Act on the notification on display
    Open,
    Wait(u64),
    Lock,
    Crash,
    Change {
        current: String,
        new: String,
    },
    Status,
}

/// Parse one line; blank lines and comments yield `None`
pub fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let words = shlex::split(line).ok_or_else(|| anyhow!("unbalanced quotes"))?;
    let (name, args) = match words.split_first() {
        Some((name, args)) => (name.as_str(), args),
        None => return Ok(None),
    };

    let arg = |index: usize| -> anyhow::Result<String> {
        args.get(index)
            .cloned()
            .ok_or_else(|| anyhow!("{} needs {} argument(s)", name, index + 1))
    };

    let command = match name {
        "click" => Command::Click(arg(0)?),
        "dblclick" => Command::DoubleClick(arg(0)?),
        "type" => Command::Type(arg(0)?),
        "backspace" => Command::Backspace,
        "submit" => Command::Submit(arg(0)?),
        "cancel" => Command::Cancel,
        "hide" => Command::Hide,
        "show" => Command::Show,
        "blur" => Command::Blur,
        "focus" => Command::Focus,
        "activity" => Command::Activity,
        "unload" => Command::Unload,
        "event" => Command::Event {
            id: arg(0)?,
            sender: arg(1)?,
            body: args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default(),
        },
        "open" => Command::Open,
        "wait" => Command::Wait(
            arg(0)?
                .parse()
                .with_context(|| format!("bad duration in {:?}", line))?,
        ),
        "lock" => Command::Lock,
        "crash" => Command::Crash,
        "change" => Command::Change {
            current: arg(0)?,
            new: arg(1)?,
        },
        "status" => Command::Status,
        other => bail!("unknown command {:?}", other),
    };

    if let Command::Type(digits) = &command {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            bail!("type takes digits only");
        }
    }

    Ok(Some(command))
}
