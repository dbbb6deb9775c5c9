//! `hr-portal` CLI entry-point.
//!
//! Available sub-commands:
//! - `migrate`     — create the database if needed and apply migrations.
//! - `departments` — add and list departments.
//! - `employees`   — hire (account + employee) and list employees.
//! - `requests`    — list, show, create, update and delete requests.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use db::models::RequestStatus;
use db::repository::directory::{self, NewAccount, NewEmployee};
use db::{Database, DatabaseConfig, MySqlStore};
use service::{CreateRequest, ItemInput, RequestService, ServiceError, UpdateRequest};

/// Exit code used when the addressed request does not exist.
const EXIT_NOT_FOUND: u8 = 2;

#[derive(Parser)]
#[command(name = "hr-portal", about = "HR portal data-access tool", version)]
struct Cli {
    /// Path to the JSON config file; `DB_*` env vars override its values.
    #[arg(long, env = "HR_PORTAL_CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database if absent and apply pending migrations.
    Migrate,
    /// Manage departments.
    #[command(subcommand)]
    Departments(DepartmentCommand),
    /// Manage employees.
    #[command(subcommand)]
    Employees(EmployeeCommand),
    /// Manage requests and their items.
    #[command(subcommand)]
    Requests(RequestCommand),
}

#[derive(Subcommand)]
enum DepartmentCommand {
    List,
    Add { name: String, description: String },
}

#[derive(Subcommand)]
enum EmployeeCommand {
    List,
    /// Create an account and its employee record.
    Hire {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        department: Option<i64>,
        /// Hire date as YYYY-MM-DD; defaults to today.
        #[arg(long)]
        hire_date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum RequestCommand {
    List,
    Show { id: i64 },
    Create {
        #[arg(long)]
        employee: i64,
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        status: Option<RequestStatus>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        items: ItemArgs,
    },
    Update {
        id: i64,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        status: Option<RequestStatus>,
        #[arg(long)]
        description: Option<String>,
        /// Remove the description.
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
        #[command(flatten)]
        items: ItemArgs,
        /// Remove every item (ignored when `--item` is given).
        #[arg(long)]
        clear_items: bool,
    },
    /// Set the status of a request.
    Status { id: i64, status: RequestStatus },
    /// Append items to a request.
    AddItems {
        id: i64,
        #[command(flatten)]
        items: ItemArgs,
    },
    Delete { id: i64 },
}

#[derive(Args)]
struct ItemArgs {
    /// An item as NAME or NAME:QUANTITY; repeat for several items.
    #[arg(long = "item", value_parser = parse_item)]
    items: Vec<ItemInput>,
}

fn parse_item(raw: &str) -> Result<ItemInput, String> {
    let (name, quantity) = match raw.rsplit_once(':') {
        Some((name, qty)) => {
            let qty: i32 = qty
                .parse()
                .map_err(|_| format!("invalid quantity in '{raw}'"))?;
            if qty < 1 {
                return Err(format!("quantity must be at least 1 in '{raw}'"));
            }
            (name, Some(qty))
        }
        None => (raw, None),
    };

    if name.trim().is_empty() {
        return Err("item name must not be empty".to_string());
    }
    Ok(ItemInput::new(name.trim(), quantity))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(config_path: &Path) -> anyhow::Result<Database> {
    let config = DatabaseConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let db = db::bootstrap(&config)
        .await
        .context("database initialization failed")?;
    Ok(db)
}

async fn run_departments(db: &Database, command: DepartmentCommand) -> anyhow::Result<()> {
    match command {
        DepartmentCommand::List => print_json(&directory::list_departments(db.pool()).await?),
        DepartmentCommand::Add { name, description } => {
            let department = directory::insert_department(db.pool(), &name, &description).await?;
            info!(department_id = department.id, "department created");
            print_json(&department)
        }
    }
}

async fn run_employees(db: &Database, command: EmployeeCommand) -> anyhow::Result<()> {
    match command {
        EmployeeCommand::List => print_json(&directory::list_employees(db.pool()).await?),
        EmployeeCommand::Hire {
            email,
            first_name,
            last_name,
            position,
            department,
            hire_date,
        } => {
            let account = NewAccount {
                email,
                // Credentials are managed by the account service, not this tool.
                password_hash: String::new(),
                title: None,
                first_name,
                last_name,
                role: "user".to_string(),
            };
            let employee = NewEmployee {
                department_id: department,
                position,
                hire_date: hire_date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
            };
            let hired = directory::hire_employee(db.pool(), &account, &employee).await?;
            info!(employee_id = hired.id, "employee hired");
            print_json(&hired)
        }
    }
}

async fn run_requests(db: &Database, command: RequestCommand) -> anyhow::Result<()> {
    let svc = RequestService::new(MySqlStore::new(db));

    let result = match command {
        RequestCommand::List => {
            return print_json(&svc.get_all().await?);
        }
        RequestCommand::Show { id } => svc.get_by_id(id).await?,
        RequestCommand::Create {
            employee,
            kind,
            status,
            description,
            items,
        } => {
            svc.create(CreateRequest {
                employee_id: employee,
                kind,
                status,
                description,
                items: items.items,
            })
            .await?
        }
        RequestCommand::Update {
            id,
            kind,
            status,
            description,
            clear_description,
            items,
            clear_items,
        } => {
            let description = match (description, clear_description) {
                (Some(text), _) => Some(Some(text)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let items = match (items.items.is_empty(), clear_items) {
                (false, _) => Some(items.items),
                (true, true) => Some(Vec::new()),
                (true, false) => None,
            };
            svc.update(
                id,
                UpdateRequest {
                    kind,
                    status,
                    description,
                    items,
                },
            )
            .await?
        }
        RequestCommand::Status { id, status } => svc.update_status(id, status).await?,
        RequestCommand::AddItems { id, items } => svc.add_items(id, &items.items).await?,
        RequestCommand::Delete { id } => {
            svc.delete(id).await?;
            println!("request {id} deleted");
            return Ok(());
        }
    };

    print_json(&result)
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ServiceError>()
        .is_some_and(ServiceError::is_not_found)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = match connect(&cli.config).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("❌ {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Migrate => {
            info!("Migrations applied successfully");
            Ok(())
        }
        Command::Departments(cmd) => run_departments(&db, cmd).await,
        Command::Employees(cmd) => run_employees(&db, cmd).await,
        Command::Requests(cmd) => run_requests(&db, cmd).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_not_found(&e) => {
            eprintln!("❌ {e}");
            ExitCode::from(EXIT_NOT_FOUND)
        }
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_without_quantity_leaves_it_unset() {
        assert_eq!(parse_item("Laptop").unwrap(), ItemInput::new("Laptop", None));
    }

    #[test]
    fn item_with_quantity_is_split_on_last_colon() {
        assert_eq!(
            parse_item("USB-C: cable:3").unwrap(),
            ItemInput::new("USB-C: cable", Some(3))
        );
    }

    #[test]
    fn non_numeric_or_zero_quantity_is_rejected() {
        assert!(parse_item("Mouse:two").is_err());
        assert!(parse_item("Mouse:0").is_err());
        assert!(parse_item(":2").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn update_flags_parse() {
        let cli = Cli::try_parse_from([
            "hr-portal", "requests", "update", "4", "--status", "approved", "--clear-items",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Requests(RequestCommand::Update { id: 4, status: Some(RequestStatus::Approved), clear_items: true, .. })
        ));
    }

    #[test]
    fn clear_description_conflicts_with_a_new_description() {
        let cli = Cli::try_parse_from(["hr-portal", "requests", "update", "4", "--clear-description"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Requests(RequestCommand::Update { clear_description: true, description: None, .. })
        ));

        assert!(Cli::try_parse_from([
            "hr-portal", "requests", "update", "4", "--clear-description", "--description", "x",
        ])
        .is_err());
    }
}
