//! Grimoire CLI
//!
//! Operates directly on a data directory: inspect classes, submit quiz
//! attempts, buy from a class shop, enroll users and print rankings.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use grimoire_core::model::ClassDetails;
use grimoire_core::schema::validate;
use grimoire_core::{ClassServices, Repositories, StoreConfig};

#[derive(Parser)]
#[command(name = "grimoire")]
#[command(version)]
#[command(about = "Grimoire classroom data tool", long_about = None)]
struct Cli {
    /// YAML config file (dataDir, logLevel)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Data directory; overrides config and GRIMOIRE_DATA_DIR
    #[arg(long, short = 'd', global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect classes (list, show)
    Classes {
        #[command(subcommand)]
        command: ClassCommands,
    },
    /// Quiz attempts
    Quiz {
        #[command(subcommand)]
        command: QuizCommands,
    },
    /// Class shop (list, purchase, restock)
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Enroll a user in a class
    Enroll {
        #[arg(long)]
        class: String,
        #[arg(long)]
        user: String,
    },
    /// Leaderboards for a class
    Ranking {
        #[arg(long)]
        class: String,
        /// Rank houses instead of users
        #[arg(long)]
        houses: bool,
    },
}

#[derive(Subcommand)]
enum ClassCommands {
    /// List every class in the data directory
    List,
    /// Show one class with its members
    Show {
        /// Class id
        id: String,
    },
}

#[derive(Subcommand)]
enum QuizCommands {
    /// Submit an attempt and print the result
    Submit {
        #[arg(long)]
        class: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        quiz: String,
        /// Comma-separated option indexes, `-` for unanswered (e.g. "0,2,-,1")
        #[arg(long, allow_hyphen_values = true)]
        answers: String,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// List items in a class shop
    List {
        #[arg(long)]
        class: String,
    },
    /// Buy an item for a class member
    Purchase {
        #[arg(long)]
        class: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        item: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Add stock to an item
    Restock {
        #[arg(long)]
        class: String,
        #[arg(long)]
        item: String,
        #[arg(long)]
        amount: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    config.apply_env();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("grimoire_core={}", config.log_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(data_dir = %config.data_dir.display(), "opening data directory");
    let repos = Repositories::from_config(&config)?;
    let services = ClassServices::new(&repos);

    match cli.command {
        Commands::Classes { command } => match command {
            ClassCommands::List => handle_class_list(&repos).await?,
            ClassCommands::Show { id } => handle_class_show(&repos, &id).await?,
        },

        Commands::Quiz { command } => match command {
            QuizCommands::Submit {
                class,
                user,
                quiz,
                answers,
            } => {
                let answers = parse_answers(&answers)?;
                let result = services
                    .quiz_submission
                    .submit_attempt(&class, &user, &quiz, &answers)
                    .await?;

                println!("✓ Attempt recorded");
                println!("  Score:       {} ({} correct)", result.score, result.correct_answers);
                println!("  Attempts:    {}", result.attempts);
                println!("  Best score:  {}", result.best_score);
                println!("  Max combo:   {}", result.max_combo);
                if result.xp_gained > 0 {
                    println!(
                        "  XP gained:   {} (combo +{}, performance +{})",
                        result.xp_gained, result.combo_bonus, result.performance_bonus
                    );
                    println!("  Galleons:    +{}", result.galleons_gained);
                } else if result.is_first_attempt {
                    println!("  No rewards: score below threshold");
                } else {
                    println!("  No rewards: rewards are only granted on the first attempt");
                }
            }
        },

        Commands::Shop { command } => match command {
            ShopCommands::List { class } => {
                let items = services.shop.list(&class).await?;
                if items.is_empty() {
                    println!("No items in shop.");
                    return Ok(());
                }
                println!("\n{:<38} {:<24} {:<12} {:>8} {:>6}", "ID", "NAME", "CATEGORY", "PRICE", "STOCK");
                println!("{}", "-".repeat(92));
                for item in items {
                    println!(
                        "{:<38} {:<24} {:<12} {:>8} {:>6}",
                        item.id, item.name, item.category, item.price, item.stock
                    );
                }
                println!();
            }
            ShopCommands::Purchase {
                class,
                user,
                item,
                quantity,
            } => {
                let receipt = services.shop.purchase(&class, &user, &item, quantity).await?;
                println!("✓ Purchased {} x {}", receipt.quantity, receipt.item.name);
                println!("  Charged:     {} galleons", receipt.galleons_charged);
                println!("  Balance:     {} galleons", receipt.new_balance);
                println!("  Stock left:  {}", receipt.remaining_stock);
            }
            ShopCommands::Restock {
                class,
                item,
                amount,
            } => {
                let restocked = services.shop.restock(&class, &item, amount).await?;
                println!("✓ '{}' restocked, now {} in stock", restocked.name, restocked.stock);
            }
        },

        Commands::Enroll { class, user } => {
            let outcome = services.enrollment.enroll(&class, &user).await?;
            if outcome.was_already_enrolled() {
                println!("Already enrolled in '{}'.", class);
            } else {
                println!("✓ Enrolled '{}' in '{}'", user, class);
            }
        }

        Commands::Ranking { class, houses } => {
            if houses {
                let stats = services.ranking.houses(&class).await?;
                println!("\n{:<12} {:>8} {:>10} {:>8}", "HOUSE", "MEMBERS", "TOTAL XP", "AVG XP");
                println!("{}", "-".repeat(42));
                for house in stats {
                    println!(
                        "{:<12} {:>8} {:>10} {:>8}",
                        house.house_id, house.members, house.total_xp, house.avg_xp
                    );
                }
            } else {
                let users = services.ranking.users(&class).await?;
                println!("\n{:<4} {:<24} {:<12} {:>8} {:>6}", "#", "NAME", "HOUSE", "XP", "LEVEL");
                println!("{}", "-".repeat(58));
                for (position, user) in users.iter().enumerate() {
                    println!(
                        "{:<4} {:<24} {:<12} {:>8} {:>6}",
                        position + 1,
                        user.name,
                        user.house,
                        user.xp,
                        user.level
                    );
                }
            }
            println!();
        }
    }

    Ok(())
}

async fn handle_class_list(repos: &Repositories) -> anyhow::Result<()> {
    let classes = repos.classes.all().await?;
    if classes.is_empty() {
        println!("No classes found.");
        return Ok(());
    }

    println!("\n{:<38} {:<28} {:>8} {:>8} {:<8}", "ID", "NAME", "MEMBERS", "QUIZZES", "ACCESS");
    println!("{}", "-".repeat(94));
    for class in &classes {
        println!(
            "{:<38} {:<28} {:>8} {:>8} {:<8}",
            class.details.id,
            class.details.name,
            class.users.len(),
            class.quizzes.len(),
            if class.details.is_private { "private" } else { "public" }
        );
    }
    println!("\nTotal: {} class(es)", classes.len());
    Ok(())
}

async fn handle_class_show(repos: &Repositories, id: &str) -> anyhow::Result<()> {
    let Some(class) = repos.classes.find_by_id(id).await? else {
        bail!("class '{}' not found", id);
    };

    let mut details: ClassDetails = validate(&serde_json::to_value(&class)?)?;
    details.password = None;
    println!("{}", serde_json::to_string_pretty(&details)?);

    println!("\nMembers:");
    for (user_id, member) in &class.users {
        println!(
            "  {:<38} xp {:>6}  level {:>3}  galleons {:>6}  quizzes {:>3}",
            user_id,
            member.progress.xp,
            member.progress.level,
            member.progress.currencies.galleons,
            member.completed_quizzes.len()
        );
    }
    println!("\nQuizzes: {}  Missions: {}  Shop items: {}", class.quizzes.len(), class.missions.len(), class.shop.len());
    Ok(())
}

fn parse_answers(raw: &str) -> anyhow::Result<Vec<Option<usize>>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|answer| match answer {
            "-" => Ok(None),
            index => index
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("invalid answer '{}': expected an option index or '-'", index)),
        })
        .collect()
}
