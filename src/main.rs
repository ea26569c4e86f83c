mod arxiv;
mod cli;
mod openai;
mod report;
mod session;
mod synthesis;
#[cfg(test)]
mod testing;

pub const USER_AGENT: &str = concat!("scholar/", env!("CARGO_PKG_VERSION"));

use std::io::Write;
use std::time::Duration;

use arxiv::{ArxivClient, SourceClient};
use clap::Parser;
use cli::{Args, Command, HELP};
use openai::{CompletionClient, OpenAiClient};
use session::{Controller, Session, SessionError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scholar=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let timeout = Duration::from_secs(args.timeout.max(1));

    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()?;
    let source = ArxivClient::from_env(http.clone())?;
    let completion = OpenAiClient::from_env(http)?
        .with_models(args.summary_model.clone(), args.model.clone())
        .with_timeout(timeout);
    let mut controller = Controller::new(source, completion);

    match args.query() {
        Some(query) if !args.interactive => {
            let outcome = respond(&mut controller, Command::Ask(query), args.json).await?;
            outcome.print();
            if let Some(e) = outcome.error {
                return Err(e.into());
            }
        }
        query => {
            if let Some(query) = query {
                respond(&mut controller, Command::Ask(query), args.json)
                    .await?
                    .report();
            }
            info!("starting interactive session");
            interactive(&mut controller, args.json).await?;
        }
    }
    Ok(())
}

async fn interactive<S: SourceClient, C: CompletionClient>(
    controller: &mut Controller<S, C>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("scholar> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Empty => {}
            Command::Help => eprintln!("{HELP}"),
            Command::New => {
                controller.reset();
                eprintln!("Started a new session.");
            }
            command => respond(controller, command, json).await?.report(),
        }
    }
    Ok(())
}

/// Rendered session after a command, plus the error the command failed with, if any.
struct Outcome {
    output: Option<String>,
    error: Option<SessionError>,
}

impl Outcome {
    fn print(&self) {
        if let Some(output) = &self.output {
            println!("{output}");
        }
    }

    /// Print, and report the error without ending the session.
    fn report(self) {
        self.print();
        if let Some(e) = self.error {
            eprintln!("{e}");
        }
    }
}

/// Run a question or follow-up to a settled state and render the session. Failures that
/// leave the session untouched (empty query, unknown question number) render nothing.
async fn respond<S: SourceClient, C: CompletionClient>(
    controller: &mut Controller<S, C>,
    command: Command,
    json: bool,
) -> Result<Outcome, serde_json::Error> {
    let error = match command {
        Command::Ask(query) => controller.submit(&query).await.err(),
        Command::FollowUp(n) => controller.follow_up(n).await.err(),
        _ => None,
    };
    let output = match &error {
        Some(SessionError::EmptyQuery | SessionError::NoSuchQuestion(_)) => None,
        _ => Some(render(controller.session(), json)?),
    };
    Ok(Outcome { output, error })
}

fn render(session: &Session, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(session)
    } else {
        Ok(report::render(session))
    }
}
