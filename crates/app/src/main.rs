mod commands;

use std::fmt;
use std::sync::Arc;

use exam_core::model::{ExamSettingsDraft, ExamSetup};
use remote::config::TOKEN_ENV;
use remote::{ExamApiConfig, ExamService, HttpExamService};
use services::{
    AttemptController, AttemptPhase, AttemptSnapshot, Clock, ErrorSource, ExamSetupService,
    ResumeOutcome, SubmitOutcome, SubmitTrigger, TimeSource,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use commands::{Command, print_help};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTick { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTick { raw } => write!(f, "invalid --tick-ms value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Default)]
struct Args {
    base_url: Option<String>,
    token: Option<String>,
    tick_ms: Option<u64>,
    help: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--base-url" => parsed.base_url = Some(require_value(args, "--base-url")?),
                "--token" => parsed.token = Some(require_value(args, "--token")?),
                "--tick-ms" => {
                    let value = require_value(args, "--tick-ms")?;
                    let tick = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTick { raw: value.clone() })?;
                    parsed.tick_ms = Some(tick);
                }
                "--help" | "-h" => parsed.help = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }

    fn api_config(&self) -> Result<ExamApiConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.base_url {
            Some(url) => {
                let config = ExamApiConfig::new(url)?;
                match std::env::var(TOKEN_ENV) {
                    Ok(token) => config.with_token(token),
                    Err(_) => config,
                }
            }
            None => ExamApiConfig::from_env()?,
        };
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        Ok(config)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam [--base-url <url>] [--token <token>] [--tick-ms <ms>]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_API_BASE_URL, STUDY_API_TOKEN, STUDY_API_TIMEOUT_SECS");
    eprintln!("  RUST_LOG (default: info)");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_snapshot(snapshot: &AttemptSnapshot) {
    println!("phase: {}", snapshot.phase);
    if let Some(id) = &snapshot.attempt_id {
        println!(
            "attempt {id}: question {}/{}, answered {}",
            snapshot.current_index + 1,
            snapshot.question_count,
            snapshot.answered_count
        );
    }
    if let Some(secs) = snapshot.remaining_seconds {
        println!("time left: {:02}:{:02}", secs / 60, secs % 60);
    }
    if let Some(error) = &snapshot.last_error {
        println!("last error: {error}");
    }
}

fn print_question(snapshot: &AttemptSnapshot) {
    let Some(question) = &snapshot.current_question else {
        println!("no question to show");
        return;
    };
    let kind = if question.is_multiple() {
        "choose any"
    } else {
        "choose one"
    };
    println!(
        "Q{} [{}, {} pt, {kind}] {}",
        snapshot.current_index + 1,
        question.difficulty,
        question.points,
        question.text
    );
    for option in &question.options {
        let mark = if snapshot.answers.is_selected(question.id, option.id) {
            'x'
        } else {
            ' '
        };
        println!("  [{mark}] {}: {}", option.id, option.text);
    }
}

fn print_setup(setup: &ExamSetup) {
    for subject in setup.subjects() {
        let chapters = if subject.has_chapters() {
            format!(
                "{}/{} chapters",
                subject.selected_chapters().len(),
                subject.chapters().len()
            )
        } else {
            "all chapters".to_string()
        };
        println!(
            "  subject {}: {} questions ({chapters})",
            subject.subject_id(),
            subject.contribution()
        );
    }
    println!(
        "available {}, requested {}, difficulty {}, limit {}",
        setup.total_available(),
        setup.requested_count(),
        setup
            .difficulty()
            .map_or_else(|| "any".to_string(), |d| d.to_string()),
        setup
            .time_limit_minutes()
            .map_or_else(|| "none".to_string(), |m| format!("{m} min"))
    );
}

/// Print terminal results, including ones produced by the countdown.
fn spawn_result_printer(controller: &AttemptController) {
    let mut updates = controller.subscribe();
    tokio::spawn(async move {
        let mut last_phase = updates.borrow().phase;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.phase != last_phase && snapshot.phase.is_terminal() {
                if let Some(result) = &snapshot.result {
                    println!(
                        "attempt {} graded: {}/{} ({:.0}%), {} correct",
                        result.attempt_id,
                        result.score,
                        result.max_score,
                        result.percentage(),
                        result.correct_count()
                    );
                }
            }
            last_phase = snapshot.phase;
        }
    });
}

fn report_resume(outcome: &ResumeOutcome, controller: &AttemptController) {
    match outcome {
        ResumeOutcome::NoActiveAttempt => println!("no attempt in progress; `help` lists commands"),
        ResumeOutcome::Resumed => {
            println!("resumed attempt in progress");
            print_snapshot(&controller.snapshot());
        }
        ResumeOutcome::AutoSubmitted(_) => {
            println!("previous attempt had expired and was submitted; `finish` to continue");
        }
    }
}

fn show_move(controller: &AttemptController, moved: bool) {
    if !moved {
        println!("cannot move there");
    }
    print_question(&controller.snapshot());
}

async fn execute(
    command: Command,
    controller: &AttemptController,
    setup_service: &ExamSetupService,
    setup: &mut ExamSetup,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Help => print_help(),
        Command::Status => {
            print_snapshot(&controller.snapshot());
            print_setup(setup);
        }
        Command::Show => print_question(&controller.snapshot()),
        Command::Resume => {
            let outcome = controller.resume().await?;
            report_resume(&outcome, controller);
        }
        Command::AddSubject { subject, declared } => {
            let total = setup_service.add_subject(setup, subject, declared).await;
            println!("available: {total}");
        }
        Command::RemoveSubject(subject) => {
            println!("available: {}", setup.remove_subject(subject));
        }
        Command::ToggleChapter { subject, chapter } => {
            println!("available: {}", setup.toggle_chapter(subject, chapter));
        }
        Command::AllChapters(subject) => {
            println!("available: {}", setup.select_all_chapters(subject));
        }
        Command::NoChapters(subject) => {
            println!("available: {}", setup.deselect_all_chapters(subject));
        }
        Command::Count(count) => {
            println!("requested: {}", setup.set_requested_count(count));
        }
        Command::Difficulty(difficulty) => setup.set_difficulty(difficulty),
        Command::TimeLimit(minutes) => setup.set_time_limit(minutes)?,
        Command::Start => {
            controller.start_from_setup(setup).await?;
            print_snapshot(&controller.snapshot());
            print_question(&controller.snapshot());
        }
        Command::Retry => {
            controller.retry_start().await?;
            print_question(&controller.snapshot());
        }
        Command::Pick(option) => {
            let Some(question) = controller.current_question() else {
                println!("no active question");
                return Ok(());
            };
            if controller.select_option(question.id, option) {
                print_question(&controller.snapshot());
            } else {
                println!("selection ignored");
            }
        }
        Command::Clear => {
            if let Some(question) = controller.current_question() {
                controller.clear_answer(question.id);
            }
            print_question(&controller.snapshot());
        }
        Command::Next => show_move(controller, controller.next_question()),
        Command::Prev => show_move(controller, controller.previous_question()),
        Command::Goto(index) => show_move(controller, controller.go_to_question(index)),
        Command::Submit => {
            if controller.submit(SubmitTrigger::Manual).await? == SubmitOutcome::Ignored {
                println!("nothing to submit");
            }
        }
        Command::Cancel => {
            controller.cancel().await?;
            println!("attempt cancelled");
        }
        Command::Finish => {
            let result = controller.finish()?;
            debug!(attempt_id = %result.attempt_id, "result dismissed");
            println!("ready for a new attempt");
        }
        Command::Quit => {}
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.help {
        print_usage();
        return Ok(());
    }

    init_tracing();

    let settings = ExamSettingsDraft {
        tick_interval_ms: args.tick_ms,
        ..ExamSettingsDraft::default()
    }
    .validate()?;
    let config = args.api_config()?;
    info!(base_url = %config.base_url(), "using exam service");

    let service: Arc<dyn ExamService> = Arc::new(HttpExamService::new(config)?);
    let clock: Arc<dyn TimeSource> = Arc::new(Clock::system());
    let controller = AttemptController::new(Arc::clone(&service), clock, &settings);
    let setup_service = ExamSetupService::new(service);
    let mut setup = ExamSetup::new(settings);

    spawn_result_printer(&controller);

    match controller.resume().await {
        Ok(outcome) => report_resume(&outcome, &controller),
        Err(err) => {
            let retry = match controller.phase() {
                AttemptPhase::Errored(ErrorSource::Submit) => "submit",
                _ => "resume",
            };
            println!("startup check failed: {err}; `{retry}` retries");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(commands::CommandError::Empty) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if let Err(err) = execute(command, &controller, &setup_service, &mut setup).await {
            println!("error: {err}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
