//! Verb parsing: whitespace split, optional leading slash, natural-language
//! aliases, and the legacy `bottle <verb>` two-token form.

/// A parsed command with raw arguments. Validation (id parsing, content
/// length) happens in the interpreter so failures map to templated
/// responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    New { content: String },
    Check,
    Reply { id_token: Option<String>, content: String },
    List,
    Stats,
    Unknown { verb: String },
}

/// Parse one inbound message into a [`Command`].
#[must_use]
pub fn parse_command(raw: &str) -> Command {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return Command::Unknown { verb: String::new() };
    };

    let mut verb = first.to_lowercase();
    if let Some(stripped) = verb.strip_prefix('/') {
        verb = stripped.to_string();
    }

    // Legacy `bottle <verb>` form collapses to `<verb>`.
    let mut args_at = 1;
    if verb == "bottle" && tokens.len() > 1 {
        verb = tokens[1].to_lowercase();
        args_at = 2;
    }

    // Two-token alias: "pick up" ≙ check.
    if verb == "pick"
        && tokens
            .get(args_at)
            .is_some_and(|t| t.eq_ignore_ascii_case("up"))
    {
        return Command::Check;
    }

    match verb.as_str() {
        "help" => Command::Help,
        "new" | "release" => Command::New {
            content: tokens[args_at..].join(" "),
        },
        "check" => Command::Check,
        "reply" | "respond" => Command::Reply {
            id_token: tokens.get(args_at).map(ToString::to_string),
            content: tokens
                .get(args_at + 1..)
                .map(|rest| rest.join(" "))
                .unwrap_or_default(),
        },
        "list" | "listing" => Command::List,
        "stats" => Command::Stats,
        _ => Command::Unknown { verb },
    }
}
