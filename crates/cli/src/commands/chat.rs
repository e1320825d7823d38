//! Chat command handler.
//!
//! Reads questions from stdin and answers them with the session's recent
//! turns replayed into the prompt.

use super::{llm_client, print_answer};
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::{ConversationMemory, KnowledgeBase};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /history, /clear, /stats, /help, /exit";

/// Interactive question answering with conversation memory
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Knowledge base name
    pub base: String,

    /// Number of passages to retrieve per question (overrides the base's top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command for base '{}'", self.base);

        let base = KnowledgeBase::open(&config.workspace, &self.base).await?;
        let llm = llm_client(config)?;

        let mut engine = base.answer_engine(llm, &config.model)?;
        if let Some(k) = self.top_k {
            engine = engine.with_top_k(k);
        }

        let memory = ConversationMemory::new(base.config().max_history_turns);
        let session = memory.create_session().await;
        tracing::debug!("Chat session {} started", session);

        println!("Chatting with knowledge base '{}'. {}", self.base, HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();

            match line {
                "" => continue,
                "/exit" | "/quit" => break,
                "/help" => println!("{}", HELP),
                "/clear" => {
                    memory.clear(session).await;
                    println!("Conversation history cleared.");
                }
                "/history" => {
                    let turns = memory.history(session, None).await;
                    if turns.is_empty() {
                        println!("No conversation yet.");
                    }
                    for turn in turns {
                        println!("[{}] You: {}", turn.timestamp.format("%H:%M:%S"), turn.query);
                        println!("Assistant: {}", turn.answer);
                    }
                }
                "/stats" => {
                    if let Some(stats) = memory.session_stats(session).await {
                        println!(
                            "{} turns over {:.1} minutes",
                            stats.turns, stats.duration_minutes
                        );
                    }
                }
                question => {
                    let history = memory.history_entries(session, None).await;
                    match engine.ask(question, &history).await {
                        Ok(answer) => {
                            print_answer(&answer);
                            memory.record_turn(session, question, &answer.answer).await;
                        }
                        // A failed turn does not end the conversation
                        Err(e) => {
                            tracing::warn!("Question failed: {}", e);
                            eprintln!("Error: {}", e);
                        }
                    }
                    println!();
                }
            }
        }

        memory.end_session(session).await;
        tracing::debug!("Chat session {} ended", session);

        Ok(())
    }
}
