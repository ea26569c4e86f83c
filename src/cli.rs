use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "scholar", version, about, long_about = None)]
pub struct Args {
    /// Research question. Without one, an interactive session starts.
    pub query: Vec<String>,

    /// Keep the session open for follow-up questions after answering QUERY
    #[arg(short, long)]
    pub interactive: bool,

    /// Print the session as JSON instead of Markdown
    #[arg(long)]
    pub json: bool,

    /// Model for the cited summary (overrides SCHOLAR_SUMMARY_MODEL)
    #[arg(long, value_name = "MODEL")]
    pub summary_model: Option<String>,

    /// Model for direct answer, consensus, key facts and related questions (overrides SCHOLAR_MODEL)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,
}

impl Args {
    pub fn query(&self) -> Option<String> {
        let query = self.query.join(" ");
        let query = query.trim();
        (!query.is_empty()).then(|| query.to_string())
    }
}

/// A line typed at the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    /// Ask the nth related question.
    FollowUp(usize),
    New,
    Quit,
    Help,
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Self::Empty,
            ":q" | ":quit" | ":exit" => Self::Quit,
            ":new" | ":reset" => Self::New,
            ":help" | ":h" | "?" => Self::Help,
            _ => match line.parse::<usize>() {
                Ok(n) => Self::FollowUp(n),
                Err(_) => Self::Ask(line.to_string()),
            },
        }
    }
}

pub const HELP: &str = "\
Type a question to research it. Later questions reuse the retrieved articles.
  <n>     ask related question n
  :new    start over with fresh retrieval
  :quit   exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_words_are_joined() {
        let args = Args::parse_from(["scholar", "is", "aspartame", "bad?"]);
        assert_eq!(args.query().as_deref(), Some("is aspartame bad?"));
        assert_eq!(args.timeout, 30);
        assert!(!args.json);
    }

    #[test]
    fn missing_query_is_none() {
        let args = Args::parse_from(["scholar", "-i"]);
        assert!(args.interactive);
        assert_eq!(args.query(), None);
    }

    #[test]
    fn model_overrides_parse() {
        let args = Args::parse_from([
            "scholar",
            "--summary-model",
            "gpt-4o",
            "--model",
            "gpt-4o-mini",
            "--timeout",
            "5",
            "q",
        ]);
        assert_eq!(args.summary_model.as_deref(), Some("gpt-4o"));
        assert_eq!(args.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(args.timeout, 5);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse(":quit"), Command::Quit);
        assert_eq!(Command::parse(":new"), Command::New);
        assert_eq!(Command::parse("2"), Command::FollowUp(2));
        assert_eq!(
            Command::parse(" what about kids? "),
            Command::Ask("what about kids?".into())
        );
    }
}
