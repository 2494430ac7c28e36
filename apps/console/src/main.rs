use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_chats::RawAttachment;
use parley_config::load as load_config;
use parley_database::{ConversationRepository, CreateUserRequest, MessageRepository, UserRepository};
use parley_runtime::{telemetry, BackendServices};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley chat backend (console by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations and exit
    Migrate,
    /// Dump users, conversations and messages as JSON
    DumpData,
    /// Delete every conversation and message
    ClearData,
    /// Create the demo users alice, bob and carol
    SeedData,
    /// List registered users
    Users,
    /// List a user's conversations, newest activity first
    Conversations {
        /// Id of the calling user
        #[arg(long)]
        user: String,
    },
    /// Find or create the direct conversation with another user
    Direct {
        #[arg(long)]
        user: String,
        /// Username of the other participant
        #[arg(long)]
        with: String,
    },
    /// Create a group conversation
    Group {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        /// Usernames of the other members
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },
    /// Add members to a group you created
    AddMembers {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        user: String,
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },
    /// Remove a member from a group you created
    RemoveMember {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        member: String,
    },
    /// Post a message with optional file attachments
    Send {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        user: String,
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Print the full history of a conversation
    Messages {
        #[arg(long)]
        conversation: String,
    },
    /// Point a conversation at its newest message
    Reconcile {
        #[arg(long)]
        conversation: String,
    },
    /// Start interactive console (default)
    Console,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => run_console(&services).await,
        command => execute(&services, command).await,
    }
}

async fn execute(services: &BackendServices, command: Commands) -> Result<()> {
    let chat = &services.chat;

    match command {
        Commands::Migrate => {
            info!("database migrations applied");
            println!("Database is up to date");
        }
        Commands::DumpData => dump_data(services).await?,
        Commands::ClearData => clear_data(services).await?,
        Commands::SeedData => seed_data(services).await?,
        Commands::Users => {
            let users = UserRepository::new(services.db_pool.clone())
                .list()
                .await
                .context("failed to list users")?;
            print_json(&users)?;
        }
        Commands::Conversations { user } => {
            print_json(&chat.get_conversations_for_caller(&user).await?)?;
        }
        Commands::Direct { user, with } => {
            print_json(&chat.create_direct_conversation(&user, &with).await?)?;
        }
        Commands::Group { user, name, members } => {
            print_json(&chat.create_group_conversation(&user, &name, &members).await?)?;
        }
        Commands::AddMembers {
            conversation,
            user,
            members,
        } => {
            print_json(
                &chat
                    .add_group_participants(&conversation, &user, &members)
                    .await?,
            )?;
        }
        Commands::RemoveMember {
            conversation,
            user,
            member,
        } => {
            print_json(
                &chat
                    .remove_group_participant(&conversation, &user, &member)
                    .await?,
            )?;
        }
        Commands::Send {
            conversation,
            user,
            files,
            text,
        } => {
            let attachments = read_attachments(&files).await?;
            let text = text.join(" ");
            let content = (!text.is_empty()).then_some(text.as_str());
            print_json(
                &chat
                    .post_message(&conversation, &user, content, attachments)
                    .await?,
            )?;
        }
        Commands::Messages { conversation } => {
            print_json(&chat.get_messages(&conversation).await?)?;
        }
        Commands::Reconcile { conversation } => {
            print_json(&chat.reconcile_last_message(&conversation).await?)?;
        }
        Commands::Console => {
            println!("Already in the console");
        }
    }

    Ok(())
}

async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<RawAttachment>> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        attachments.push(RawAttachment::new(file_name, None, data));
    }
    Ok(attachments)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

#[derive(Serialize)]
struct Dump {
    users: Vec<parley_database::User>,
    conversations: Vec<parley_database::Conversation>,
    messages: Vec<parley_database::Message>,
}

async fn dump_data(services: &BackendServices) -> Result<()> {
    info!("dumping users, conversations and messages");

    let users = UserRepository::new(services.db_pool.clone())
        .list()
        .await
        .context("failed to fetch users")?;
    let conversations = ConversationRepository::new(services.db_pool.clone())
        .list_all()
        .await
        .context("failed to fetch conversations")?;

    let message_repository = MessageRepository::new(services.db_pool.clone());
    let mut messages = Vec::new();
    for conversation in &conversations {
        messages.extend(
            message_repository
                .list_for_conversation(&conversation.id)
                .await
                .with_context(|| format!("failed to fetch messages of {}", conversation.id))?,
        );
    }

    print_json(&Dump {
        users,
        conversations,
        messages,
    })
}

async fn clear_data(services: &BackendServices) -> Result<()> {
    info!("clearing conversations from database");

    let deleted = ConversationRepository::new(services.db_pool.clone())
        .delete_all()
        .await
        .context("failed to delete conversations")?;

    println!("Database cleared:");
    println!("- {deleted} conversations deleted along with their messages");
    Ok(())
}

async fn seed_data(services: &BackendServices) -> Result<()> {
    info!("seeding database with demo users");

    let users = UserRepository::new(services.db_pool.clone());
    let mut created = 0;
    for username in ["alice", "bob", "carol"] {
        let request = CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            profile_picture: None,
        };
        match users.create(&request).await {
            Ok(user) => {
                created += 1;
                println!("- {} ({})", user.username, user.id);
            }
            Err(error) if error.is_duplicate() => {
                println!("- {username} already exists");
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed to create {username}"));
            }
        }
    }

    println!("Seeded {created} users");
    println!("Run 'users' to see their ids");
    Ok(())
}

async fn run_console(services: &BackendServices) -> Result<()> {
    info!("starting interactive console");

    println!("Parley Interactive Console");
    println!("Type any subcommand, e.g. 'conversations --user <id>', or 'help'");
    println!("Use Ctrl+C or 'quit' to exit");
    println!("---");

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit" | "q") {
            println!("Goodbye!");
            break;
        }

        let words = std::iter::once("parley").chain(input.split_whitespace());
        let command = match Cli::try_parse_from(words) {
            Ok(Cli {
                command: Some(command),
            }) => command,
            Ok(Cli { command: None }) => continue,
            Err(error) => {
                println!("{error}");
                continue;
            }
        };

        if let Err(error) = execute(services, command).await {
            println!("Error: {error:#}");
        }
    }

    Ok(())
}
