use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use dealdesk::app::{App, Entry, entry_for};
use dealdesk::chat::ChatChannel;
use dealdesk::render::{self, Block};
use dealdesk::types::{ClientDetails, Identity, Message, Role};

/// Bundled config fallback for packaged builds
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

fn load_dotenv() {
    // First try to load from .env file (dev)
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // Fall back to bundled config (packaged builds)
    for line in BUNDLED_CONFIG.lines() {
        let line = line.trim();
        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Parse KEY=VALUE
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            // Only set if not already set (allow env override)
            if std::env::var(key).is_err() {
                // SAFETY: We're setting env vars at startup before any threads are spawned
                unsafe {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt().init();

    let app = App::from_env()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let result = run(&app, &mut lines).await;
    app.shutdown();
    result
}

type Input = Lines<BufReader<Stdin>>;

async fn run(app: &App, lines: &mut Input) -> anyhow::Result<()> {
    let identity = match app.credentials.load(&app.config) {
        Some(identity) => {
            println!("Signed in as {}", identity.email);
            identity
        }
        None => sign_in(app, lines).await?,
    };

    match entry_for(&identity) {
        Entry::SupportDesk => support_desk(app, lines, &identity).await,
        Entry::MainFlow => main_flow(app, lines, &identity).await,
    }
}

async fn sign_in(app: &App, lines: &mut Input) -> anyhow::Result<Identity> {
    loop {
        let mode = ask(lines, "Sign in or sign up? [in/up]").await?;
        let email = ask(lines, "Email").await?;
        let password = ask(lines, "Password").await?;

        let attempt = if mode.eq_ignore_ascii_case("up") {
            app.auth.sign_up(&email, &password).await
        } else {
            app.auth.sign_in(&email, &password).await
        };

        match attempt {
            Ok(identity) => {
                println!("Welcome, {}", identity.email);
                return Ok(identity);
            }
            // Recoverable: show the failure and ask again.
            Err(err) => println!("Authentication failed: {err}"),
        }
    }
}

async fn support_desk(app: &App, lines: &mut Input, identity: &Identity) -> anyhow::Result<()> {
    loop {
        let feed = app.chat.list_conversations().await?;
        let summaries = feed.current();
        feed.cancel();

        if summaries.is_empty() {
            println!("No conversations yet.");
        } else {
            println!("Conversations:");
            for summary in &summaries {
                let preview = summary
                    .last_message
                    .as_ref()
                    .map(|message| message.text.as_str())
                    .unwrap_or("(no messages)");
                println!("  {}  {}", summary.id, preview);
            }
        }

        let choice = ask(lines, "Conversation id (or /quit)").await?;
        if choice == "/quit" || choice.is_empty() {
            return Ok(());
        }
        converse(app, lines, identity, &choice).await?;
    }
}

async fn main_flow(app: &App, lines: &mut Input, identity: &Identity) -> anyhow::Result<()> {
    let business = loop {
        let input = ask(lines, "Tell us about your business").await?;
        if !input.is_empty() {
            break input;
        }
        println!("The description cannot be empty.");
    };

    println!("Generating your proposal...");
    match app.generator.generate_proposal(&business).await {
        Ok(proposal) => print_prose(&proposal.raw_content),
        Err(err) => {
            tracing::error!(error = %err, "proposal generation failed");
            println!("We could not generate a proposal right now: {err}");
        }
    }

    loop {
        let choice = ask(
            lines,
            "[q]uotation, [h]istory, [s]upport chat, [o] sign out, [x] exit",
        )
        .await?;
        match choice.as_str() {
            "q" => quotation_flow(app, lines, identity, &business).await?,
            "h" => history(app, identity).await,
            "s" => converse(app, lines, identity, ChatChannel::conversation_id_for(identity)).await?,
            "o" => {
                app.auth.sign_out();
                println!("Signed out.");
                return Ok(());
            }
            "x" | "" => return Ok(()),
            _ => println!("Unknown choice: {choice}"),
        }
    }
}

async fn quotation_flow(
    app: &App,
    lines: &mut Input,
    identity: &Identity,
    business: &str,
) -> anyhow::Result<()> {
    let details = ClientDetails {
        client_name: ask(lines, "Client name").await?,
        company_name: ask(lines, "Company name").await?,
        address: ask(lines, "Address").await?,
        phone_number: ask(lines, "Phone number").await?,
        email: ask(lines, "Email").await?,
    };

    println!("Generating your quotation...");
    let quotation = match app.generator.generate_quotation(business, &details).await {
        Ok(quotation) => quotation,
        Err(err) => {
            tracing::error!(error = %err, "quotation generation failed");
            println!("We could not generate a quotation right now: {err}");
            return Ok(());
        }
    };
    print_prose(&quotation.raw_content);

    let record = match app
        .records
        .save_quotation(identity, business, quotation.clone(), details.clone())
        .await
    {
        Ok(record) => Some(record),
        Err(err) => {
            // Not retried; the record is simply absent from history.
            tracing::warn!(error = %err, "failed to persist quotation");
            None
        }
    };

    loop {
        let choice = ask(lines, "[a]ccept, [d]ownload, [b]ack").await?;
        match choice.as_str() {
            "a" => match &record {
                Some(record) => match app.records.accept(&record.id).await {
                    Ok(()) => println!("You have accepted the quotation!"),
                    Err(err) => println!("Failed to accept the quotation: {err}"),
                },
                None => println!("This quotation was not saved; nothing to accept."),
            },
            "d" => {
                let html = render::printable_quotation(&quotation, &details, &app.config);
                match render::write_download(&html, &details.company_name) {
                    Ok(path) => println!("Saved to {}", path.display()),
                    Err(err) => println!("Failed to save the document: {err}"),
                }
            }
            _ => return Ok(()),
        }
    }
}

async fn history(app: &App, identity: &Identity) {
    match app.records.accepted_proposals(identity).await {
        Ok(records) if records.is_empty() => println!("No accepted proposals yet."),
        Ok(records) => {
            for record in records {
                println!("- {} ({})", record.business, record.client_details.company_name);
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "history query failed");
            println!("Could not load your accepted proposals.");
        }
    }
}

/// Live chat loop. The subscription is cancelled on /back, so nothing keeps
/// refreshing after the screen is gone.
async fn converse(
    app: &App,
    lines: &mut Input,
    identity: &Identity,
    conversation_id: &str,
) -> anyhow::Result<()> {
    let mut subscription = app.chat.subscribe(conversation_id).await?;
    println!("-- chat ({conversation_id}); /back to leave --");

    loop {
        tokio::select! {
            snapshot = subscription.recv() => {
                match snapshot {
                    Some(messages) => print_transcript(&messages, identity),
                    None => return Ok(()),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                if line.trim() == "/back" {
                    subscription.cancel();
                    return Ok(());
                }
                // Optimistic: the input line is already consumed; a failed
                // send is only reported.
                if let Err(err) = app.chat.send(conversation_id, &line, identity).await {
                    println!("Could not send: {err}");
                }
            }
        }
    }
}

fn print_transcript(messages: &[Message], viewer: &Identity) {
    println!("----------------------------------------");
    for message in messages {
        let who = if message.sender_id == viewer.id {
            "you"
        } else {
            match message.sender_role {
                Role::Support => "support",
                Role::Client => "client",
            }
        };
        println!("[{who}] {}", message.text);
    }
}

fn print_prose(raw: &str) {
    for section in render::tokenize(raw) {
        for block in &section.blocks {
            match block {
                Block::Header(text) => println!("== {text} =="),
                Block::Bullet(text) => println!("  • {text}"),
                Block::Paragraph(text) => println!("{text}"),
            }
        }
        println!();
    }
}

async fn ask(lines: &mut Input, label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await?
        .unwrap_or_default()
        .trim()
        .to_string())
}
