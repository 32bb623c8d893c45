use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Date, Duration, OffsetDateTime};

use fynli::{
    CategoryIcon, CategoryName, Color, Email, ExpenseForm, ExpenseSubmission, PasswordHash,
    PaymentMethod, PersonName, ReimbursementStatus, RemainderPolicy, ValidatedPassword,
    create_category, create_expenses, create_person, create_user, expand_installments,
    initialize_db,
};

/// A utility for creating a test database for the REST API server of fynli.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user test@example.com with the password \"test\"...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(Email::new("test@example.com")?, password_hash, &conn)?;

    println!("Creating people and categories...");

    let me: i64 = conn.query_row(
        "SELECT id FROM person WHERE user_id IS NULL ORDER BY id LIMIT 1",
        (),
        |row| row.get(0),
    )?;
    let partner = create_person(
        user.id,
        PersonName::new("Alex")?,
        Color::new("#10B981")?,
        &conn,
    )?;
    let pets = create_category(
        user.id,
        CategoryName::new("Pets")?,
        CategoryIcon::new("PawPrint")?,
        &conn,
    )?;
    let groceries: i64 = conn.query_row(
        "SELECT id FROM category WHERE user_id IS NULL AND name = 'Groceries'",
        (),
        |row| row.get(0),
    )?;

    println!("Creating expenses...");

    let today = OffsetDateTime::now_utc().date();
    let submissions = [
        (me, groceries, "Weekly groceries", 182.4, today, 1),
        (partner.id, groceries, "Farmers market", 64.0, days_ago(today, 3), 1),
        (me, pets.id, "Dog food", 119.9, days_ago(today, 12), 1),
        (partner.id, pets.id, "Vet appointment", 450.0, days_ago(today, 40), 3),
        (me, groceries, "New fridge", 3600.0, days_ago(today, 75), 12),
    ];

    for (person_id, category_id, description, amount, date, installments) in submissions {
        let submission = ExpenseSubmission::new(ExpenseForm {
            person_id,
            category_id,
            description: description.to_owned(),
            amount,
            date,
            payment_method: if installments > 1 {
                PaymentMethod::CreditCard
            } else {
                PaymentMethod::DebitCard
            },
            reimbursement_status: if person_id == me {
                ReimbursementStatus::NotApplicable
            } else {
                ReimbursementStatus::Pending
            },
            installments,
            submission_id: None,
        })?;
        let records = expand_installments(&submission, RemainderPolicy::First)?;
        create_expenses(user.id, None, &records, &conn)?;
    }

    println!("Success!");

    Ok(())
}

fn days_ago(today: Date, days: i64) -> Date {
    today.saturating_sub(Duration::days(days))
}
