use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{HttpApi, QuickRollApi, QuickRolls};
use dice::{
    Category, Color, NewQuickRoll, Notation, ObjectId, QuickRollPatch, payloads::SaveRollBody,
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the rollbook server.
    #[arg(long, env = "ROLLBOOK_URL", default_value = "http://localhost:1111")]
    url: String,

    /// 24 hex character user id.
    #[arg(long, env = "ROLLBOOK_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll dice locally, e.g. `2d6+3`.
    Roll {
        notation: String,

        /// Record the roll in the history.
        #[arg(long)]
        save: bool,
    },

    /// Show the most recent rolls.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete the user's rolls, or everyone's with `--all`.
    Clear {
        #[arg(long)]
        all: bool,
    },

    /// Manage quick rolls.
    Quick {
        #[command(subcommand)]
        action: QuickCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QuickCommand {
    List,

    Add {
        name: String,

        notation: String,

        #[arg(long)]
        color: Option<Color>,

        #[arg(long)]
        category: Option<Category>,
    },

    Edit {
        id: ObjectId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        notation: Option<String>,

        #[arg(long)]
        color: Option<Color>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        order: Option<u32>,
    },

    Rm {
        id: ObjectId,
    },

    /// Roll a saved quick roll.
    Roll {
        id: ObjectId,

        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let api = HttpApi::new(&args.url);
    let user = args.user.as_deref();

    match args.command {
        Command::Roll { notation, save } => roll(&api, &notation, save, user).await,
        Command::History { limit } => {
            let history = api.history(user, limit).await?;
            println!("{} rolls ({})", history.count, history.filter);

            for roll in history.rolamentos {
                println!(
                    "{}  {} = {:?} = {}",
                    roll.created_at.format("%Y-%m-%d %H:%M:%S"),
                    roll.notation,
                    roll.results,
                    roll.total
                );
            }

            Ok(())
        }
        Command::Clear { all } => {
            if user.is_none() && !all {
                bail!("No user id given, pass --all to clear every roll");
            }

            let cleared = api.clear_rolls(user, all).await?;
            println!("{}", cleared.message);

            Ok(())
        }
        Command::Quick { action } => {
            let user = user.context("Quick rolls need a user id, set --user or ROLLBOOK_USER")?;
            quick(api, user, action).await
        }
    }
}

async fn roll(api: &HttpApi, notation: &str, save: bool, user: Option<&str>) -> Result<()> {
    let notation = Notation::parse(notation)?;
    let outcome = notation.roll(&mut rand::thread_rng())?;
    println!("{outcome}");

    if save {
        let body = SaveRollBody {
            dados: Some(notation.base()),
            resultados: Some(outcome.results.iter().map(|&r| i64::from(r)).collect()),
            total: Some(i64::from(outcome.total)),
            user_id: user.map(str::to_string),
        };

        let saved = api.save_roll(&body).await?;
        println!("Saved as {}", saved.id);
    }

    Ok(())
}

async fn quick(api: HttpApi, user: &str, action: QuickCommand) -> Result<()> {
    let quick_rolls = QuickRolls::new(api.clone(), user);

    match action {
        QuickCommand::List => quick_rolls.fetch().await?,
        QuickCommand::Add {
            name,
            notation,
            color,
            category,
        } => {
            let fields = NewQuickRoll {
                name,
                notation,
                color,
                category,
            };
            let created = quick_rolls.create(&fields).await?;
            println!("Created {}", created.id);
        }
        QuickCommand::Edit {
            id,
            name,
            notation,
            color,
            category,
            order,
        } => {
            let patch = QuickRollPatch {
                name,
                notation,
                color,
                category,
                order,
            };
            if patch.is_empty() {
                bail!("Nothing to change");
            }

            quick_rolls.update(&id, &patch).await?;
        }
        QuickCommand::Rm { id } => quick_rolls.delete(&id).await?,
        QuickCommand::Roll { id, save } => {
            let quick_roll = api
                .list(user)
                .await?
                .into_iter()
                .find(|q| q.id == id)
                .with_context(|| format!("No quick roll {id}"))?;

            println!("{}", quick_roll.name);
            return roll(&api, &quick_roll.notation, save, Some(user)).await;
        }
    }

    for quick_roll in quick_rolls.snapshot().quick_rolls {
        println!(
            "{:>3}  {}  {:<24} {:<8} {:<7} {}",
            quick_roll.order,
            quick_roll.id,
            quick_roll.name,
            quick_roll.notation,
            quick_roll.category.as_str(),
            quick_roll.color.as_str()
        );
    }

    Ok(())
}
