use anyhow::{Context, Result};
use app_utils::{init_from_env, init_tracing, InitFromEnv};
use autolab_api::assignment::Assignment;
use autolab_api::assignment_selector::AssignmentSelector;
use autolab_api::client::Client;
use autolab_api::feedback::PollConfig;
use autolab_api::headers;
use autolab_api::preferences::Preferences;
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing::debug;

#[derive(Parser)]
#[command(name = "autolab", about = "Course assignment workflow from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List assignments with due dates, grades, and download state
    List {
        /// Emit the assignment list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download and unpack an assignment's starter code
    Download { name: String },
    /// Package and upload an assignment, then wait for grading feedback
    Submit {
        name: String,
        /// Skip waiting for the grading report
        #[arg(long)]
        no_wait: bool,
    },
    /// Fetch the latest grading feedback without submitting
    Feedback { name: String },
    /// Re-stamp Java headers in a downloaded assignment
    Stamp { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let InitFromEnv { client, prefs } = init_from_env()?;
    debug!("initialized");

    match cli.command {
        Command::List { json } => {
            let assignments = client.fetch_assignments(&prefs).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&assignments)?);
            } else {
                print_assignments(&assignments);
            }
        }
        Command::Download { name } => {
            let assignment = find_assignment(&client, &prefs, &name).await?;
            let dest = client.download(&assignment, &prefs).await?;
            println!("Downloaded {} to {}", assignment.name(), dest.display());
        }
        Command::Submit { name, no_wait } => {
            let assignment = find_assignment(&client, &prefs, &name).await?;
            client.submit(&assignment, &prefs).await?;
            println!("Submitted {}", assignment.name());

            if !no_wait {
                let report = poll(&client, &prefs, &assignment).await?;
                println!("{report}");
            }
        }
        Command::Feedback { name } => {
            let assignment = find_assignment(&client, &prefs, &name).await?;
            let report = poll(&client, &prefs, &assignment).await?;
            println!("{report}");
        }
        Command::Stamp { name } => {
            let folder = prefs.workspace_path().join(&name);
            let updated = headers::apply_headers(&folder, &prefs).await?;
            println!("Updated headers in {updated} file(s)");
        }
    }

    Ok(())
}

async fn find_assignment(client: &Client, prefs: &Preferences, name: &str) -> Result<Assignment> {
    let assignments = client.fetch_assignments(prefs).await?;
    AssignmentSelector::new(name.to_owned())
        .select_from(&assignments)
        .cloned()
        .with_context(|| format!("no assignment named \"{name}\""))
}

async fn poll(client: &Client, prefs: &Preferences, assignment: &Assignment) -> Result<String> {
    let progress = |message: &str| eprintln!("{message}");
    let report = client
        .poll_feedback(
            assignment.name(),
            prefs,
            &PollConfig::default(),
            Some(&progress),
        )
        .await?;
    Ok(report)
}

fn print_assignments(assignments: &[Assignment]) {
    for assignment in assignments {
        let status = [
            (!assignment.score().is_empty()).then(|| assignment.score().to_owned()),
            Some(format!("due {}", assignment.due_date())),
            assignment.is_downloaded().then(|| "downloaded".to_owned()),
        ]
        .into_iter()
        .flatten()
        .join(" \u{2022} ");

        println!("{}: {status}", assignment.name());
    }
}
