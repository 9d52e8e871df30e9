use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};
use clonchat_core::{
    classify, respond, rules, ConversationMessage, ProcessMessageRequest, Role,
};
use clonchat_observability::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "chatbot")]
#[command(about = "Clonchat appointment chatbot CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify a single message and print the reply.
    Classify {
        message: String,
        /// Print the full response document as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the keyword rules in evaluation order.
    Rules,
    /// Chat interactively; each line is answered until `exit` or end of input.
    Chat {
        #[arg(long, default_value_t = 0)]
        business_id: i64,
        #[arg(long, default_value = "cli")]
        session_id: String,
    },
}

fn main() -> Result<()> {
    init_tracing("clonchat_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { message, json } => {
            if json {
                let response = respond(&ProcessMessageRequest {
                    business_id: 0,
                    session_id: "cli".to_string(),
                    user_message: message,
                    conversation_history: Vec::new(),
                });
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                let result = classify(&message);
                println!("{}: {}", result.intent, result.response);
            }
        }
        Command::Rules => {
            for (position, rule) in rules().iter().enumerate() {
                println!("{}. {} {:?}", position + 1, rule.intent, rule.keywords);
            }
            println!("{}. general (fallback)", rules().len() + 1);
        }
        Command::Chat {
            business_id,
            session_id,
        } => run_chat(business_id, session_id)?,
    }

    Ok(())
}

fn run_chat(business_id: i64, session_id: String) -> Result<()> {
    let mut history: Vec<ConversationMessage> = Vec::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    println!("Clonchat chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = respond(&ProcessMessageRequest {
            business_id,
            session_id: session_id.clone(),
            user_message: message.to_string(),
            conversation_history: history.clone(),
        });

        println!("\n[{}] {}\n", reply.detected_intent, reply.bot_response);

        history.push(ConversationMessage {
            role: Role::User,
            content: message.to_string(),
        });
        history.push(ConversationMessage {
            role: Role::Assistant,
            content: reply.bot_response,
        });
    }

    Ok(())
}
