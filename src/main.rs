use evaluation_client::{
    config::{get_config, init_config},
    models::evaluation::{Evaluation, QuestionType},
    models::event::SessionEvent,
    open_session,
    services::session_service::{EvaluationSession, SubmitOutcome},
    utils::time::format_countdown,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_json);

    let evaluation_id = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: evaluation-runner <evaluation-id>"))?;

    let (session, mut events) = match open_session(config, &evaluation_id).await {
        Ok(opened) => opened,
        Err(e) => {
            error!(evaluation_id = %evaluation_id, error = %e, "failed to load evaluation");
            println!("Evaluation not found or not accessible.");
            return Ok(());
        }
    };
    print_evaluation(session.evaluation());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => handle_line(&session, line.trim()).await,
                    None => break,
                }
            }
            Some(event) = events.recv() => {
                if render_event(&event) {
                    break;
                }
            }
        }
    }

    session.close();
    info!("session closed");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_evaluation(evaluation: &Evaluation) {
    println!("{}", evaluation.title);
    if let Some(course) = &evaluation.course_name {
        println!("Course: {}", course);
    }
    match evaluation.duration_minutes {
        Some(minutes) if minutes > 0 => println!("Duration: {} min", minutes),
        _ => println!("Duration: untimed"),
    }
    println!("Passing score: {}%", evaluation.passing_score);
    for q in &evaluation.questions {
        println!();
        println!("[{}] {} ({} pt)", q.id, q.text, q.points);
        match q.question_type {
            QuestionType::MultipleChoice => {
                for option in &q.options {
                    println!("    - {}", option);
                }
            }
            QuestionType::TrueFalse => println!("    true / false"),
            QuestionType::ShortAnswer => {}
        }
    }
    println!();
    println!("Answer with <question-id>=<answer>, finish with 'submit'.");
}

async fn handle_line(session: &EvaluationSession, line: &str) {
    if line.is_empty() {
        return;
    }
    if line.eq_ignore_ascii_case("submit") {
        match session.submit_manually().await {
            // Completion and failures are also published as events.
            SubmitOutcome::Completed(_)
            | SubmitOutcome::Failed(_)
            | SubmitOutcome::AttemptsExhausted(_) => {}
            SubmitOutcome::Declined(reason) => println!("Submission declined: {:?}", reason),
        }
        return;
    }
    let Some((question_id, value)) = line.split_once('=') else {
        println!("Expected <question-id>=<answer> or 'submit'.");
        return;
    };
    if let Err(e) = session.record_answer(question_id.trim(), value.trim()).await {
        println!("{}", e);
    }
}

/// Prints an event; returns `true` when the runner should stop.
fn render_event(event: &SessionEvent) -> bool {
    match event {
        SessionEvent::AttemptStarted {
            remaining_seconds,
            resumed,
            ..
        } => {
            let verb = if *resumed { "resumed" } else { "started" };
            match remaining_seconds {
                Some(left) => println!("Attempt {}, {} left.", verb, format_countdown(*left)),
                None => println!("Attempt {}.", verb),
            }
        }
        SessionEvent::StartFailed { message } => {
            println!("Could not start the attempt: {}", message)
        }
        SessionEvent::Tick { remaining_seconds } => {
            if *remaining_seconds <= 10 || remaining_seconds % 60 == 0 {
                println!("Time left: {}", format_countdown(*remaining_seconds));
            }
        }
        SessionEvent::TimeExpired => println!("Time is up, submitting your answers."),
        SessionEvent::Completed(result) => {
            println!(
                "Score: {}/{} ({:.1}%), {}",
                result.score,
                result.total_points,
                result.percentage,
                if result.is_passed { "passed" } else { "failed" }
            );
            return true;
        }
        SessionEvent::SubmitDeclined { .. } => {}
        SessionEvent::SubmitFailed { message } => {
            println!("Submission failed: {}. You can try again.", message)
        }
        SessionEvent::AttemptsExhausted { message } => println!("{}", message),
        SessionEvent::Redirect { destination } => {
            println!("Returning to {}", destination);
            return true;
        }
    }
    false
}
