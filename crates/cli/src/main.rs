use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use telehealth_core::appointments::generate_time_slots;
use telehealth_core::config::data_dir_from_env_value;
use telehealth_core::{
    AccountId, AccountService, AccountStore, CoreConfig, FileAccountStore, NewAccount, Role,
};

#[derive(Parser)]
#[command(name = "telehealth")]
#[command(about = "Telehealth account service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all accounts
    List,
    /// Register a new account
    Register {
        /// Unique username
        username: String,
        /// Display name
        name: String,
        /// Email address
        email: String,
        /// `patient` or `doctor`
        role: String,
        /// Password (at least 6 characters)
        #[arg(long)]
        password: String,
    },
    /// Delete an account by id
    Delete {
        /// Account id (32 lowercase hex characters)
        account_id: String,
    },
    /// Print generated time slots for a doctor on a date
    Slots {
        /// Doctor id
        doctor_id: String,
        /// Date (YYYY-MM-DD)
        date: String,
    },
}

/// Direct access to the account files; needs no token secret.
fn account_store(data_dir: Option<String>) -> FileAccountStore {
    FileAccountStore::open(&data_dir_from_env_value(data_dir))
}

/// Full service for commands that issue tokens.
fn account_service() -> Result<AccountService, Box<dyn std::error::Error>> {
    let cfg = CoreConfig::from_env_values(
        std::env::var("TELEHEALTH_DATA_DIR").ok(),
        std::env::var("TELEHEALTH_TOKEN_SECRET").ok(),
        std::env::var("TELEHEALTH_TOKEN_TTL_SECS").ok(),
        std::env::var("TELEHEALTH_HASH_ITERATIONS").ok(),
    )?;
    Ok(AccountService::with_file_store(Arc::new(cfg)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let data_dir = std::env::var("TELEHEALTH_DATA_DIR").ok();

    match cli.command {
        Some(Commands::List) => {
            let accounts = account_store(data_dir).list()?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                for account in accounts {
                    println!(
                        "ID: {}, Username: {}, Name: {}, Role: {}, Created: {}",
                        account.id,
                        account.username,
                        account.name,
                        account.role,
                        account.created_at.to_rfc3339()
                    );
                }
            }
        }
        Some(Commands::Register {
            username,
            name,
            email,
            role,
            password,
        }) => {
            let role: Role = role.parse()?;
            let service = account_service()?;
            match service.register(NewAccount {
                username,
                name,
                email,
                password,
                role,
            }) {
                Ok(session) => println!("Registered account with ID: {}", session.account.id),
                Err(e) => eprintln!("Error registering account: {}", e),
            }
        }
        Some(Commands::Delete { account_id }) => {
            let id = AccountId::parse(&account_id)?;
            match account_store(data_dir).delete(&id) {
                Ok(()) => println!("Deleted account: {}", id),
                Err(e) => eprintln!("Error deleting account: {}", e),
            }
        }
        Some(Commands::Slots { doctor_id, date }) => {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")?;
            for slot in generate_time_slots(&doctor_id, date, &mut rand::thread_rng()) {
                println!(
                    "{}  {}-{}  {}",
                    slot.id,
                    slot.start_time.format("%H:%M"),
                    slot.end_time.format("%H:%M"),
                    if slot.available { "available" } else { "taken" }
                );
            }
        }
        None => {
            println!("Use --help for usage");
        }
    }

    Ok(())
}
