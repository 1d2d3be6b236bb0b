//! `shiksha tutor`: Start a grounded session and chat about it.

use super::{CliResult, load_config, open_catalog, open_vector_store};
use shiksha_core::board::Board;
use shiksha_tutor::{ChatRequest, StartSessionRequest, TutorOrchestrator};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Session parameters collected from the command line.
pub struct TutorOptions {
    pub topic: String,
    pub subject: String,
    pub grade: String,
    pub board: String,
    pub state: String,
    pub is_bed_qualified: bool,
    pub material_id: Option<u64>,
    pub material_filename: Option<String>,
}

const SESSION_ID: u64 = 1;
const TEACHER_ID: u64 = 0;

pub async fn run(options: TutorOptions, message: Option<String>) -> CliResult {
    let config = load_config()?;

    let dispatcher = shiksha_providers::build_dispatcher(&config).map_err(|e| {
        format!("{e}. Set PRIMARY_PROVIDER_KEY or FALLBACK_PROVIDER_KEY, or run `shiksha onboard`.")
    })?;

    let mut tutor = TutorOrchestrator::new(Arc::new(dispatcher)).with_limits(config.tutor.clone());

    match open_catalog(&config) {
        Ok(catalog) => tutor = tutor.with_curriculum(Arc::new(catalog)),
        Err(e) => warn!(error = %e, "Continuing without curriculum catalog"),
    }
    match open_vector_store(&config).await {
        Ok(store) => {
            tutor = tutor.with_vector_store(store, &config.vector_store.pedagogy_collection_name)
        }
        Err(e) => warn!(error = %e, "Continuing without vector store"),
    }

    eprint!("  Preparing overview...");
    let started = tutor
        .start_session(StartSessionRequest {
            session_id: SESSION_ID,
            teacher_id: TEACHER_ID,
            topic_name: options.topic.clone(),
            subject: options.subject.clone(),
            grade: options.grade.clone(),
            state: options.state,
            board: Board::parse(&options.board),
            is_bed_qualified: options.is_bed_qualified,
            material_id: options.material_id,
            material_filename: options.material_filename,
        })
        .await;
    eprint!("\r                       \r");

    let chat = |user_message: String| ChatRequest {
        session_id: SESSION_ID,
        user_message,
        subject: options.subject.clone(),
        grade: options.grade.clone(),
        is_bed_qualified: options.is_bed_qualified,
    };

    if let Some(msg) = message {
        print_reply(&started.model_used, &started.initial_message);
        let reply = tutor.chat(chat(msg)).await?;
        print_reply(&reply.model_used, &reply.response);
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Shiksha Tutor — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Topic:     {}", options.topic);
    println!("  Grade:     {} {}", options.grade, options.subject);
    println!("  Source:    {:?}", started.source_type);
    if let Some(name) = &started.material_filename {
        println!("  Material:  {name}");
    }
    println!();
    print_reply(&started.model_used, &started.initial_message);
    println!("  Ask a follow-up question and press Enter.");
    println!("  Type '/clear' to end the session, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => break,
            "/clear" => {
                tutor.clear_session(SESSION_ID).await?;
                println!("  Session cleared.");
                break;
            }
            question => {
                eprint!("  ...");
                let reply = tutor.chat(chat(question.to_string())).await;
                eprint!("\r     \r");
                match reply {
                    Ok(reply) => print_reply(&reply.model_used, &reply.response),
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        break;
                    }
                }
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}

fn print_reply(model: &str, text: &str) {
    println!();
    for line in text.lines() {
        println!("  Tutor > {line}");
    }
    println!("  ({model})");
    println!();
}
