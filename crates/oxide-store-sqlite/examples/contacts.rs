//! Address book walkthrough: register bindings, write, query, commit.
//!
//! Run with `cargo run -p oxide-store-sqlite --example contacts`.
//! Set `RUST_LOG_LEVEL=debug` to see every statement.

use std::error::Error;

use oxide_store::{bindings, CommandProvider, QueryFilter, StorageContext, TableFieldDescriptor};
use oxide_store_derive::Entity;
use oxide_store_sqlite::SqliteDriver;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ContactField {
    Id,
    Name,
    City,
    Age,
}

#[derive(Debug, Default, Clone, Entity)]
#[storage(key = ContactField)]
struct Contact {
    #[primary_key(identity)]
    id: i64,
    name: String,
    city: Option<String>,
    age: i32,
}

fn main() -> Result<(), Box<dyn Error>> {
    let log_level = match std::env::var("RUST_LOG_LEVEL").as_deref() {
        Ok("debug") => Level::DEBUG,
        Ok("trace") => Level::TRACE,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    bindings::initialize(|builder| {
        builder.register::<Contact, _>(
            "Contact",
            [
                TableFieldDescriptor::new(ContactField::Id, "id")?,
                TableFieldDescriptor::new(ContactField::Name, "name")?,
                TableFieldDescriptor::new(ContactField::City, "city")?,
                TableFieldDescriptor::new(ContactField::Age, "age")?,
            ],
        )?;
        Ok(())
    })?;

    let ctx = StorageContext::open(&SqliteDriver::new(), "Data Source=:memory:")?;

    let mut schema = ctx.create_command()?;
    schema.set_text(
        "CREATE TABLE [Contact] ([id] INTEGER PRIMARY KEY AUTOINCREMENT, \
         [name] TEXT NOT NULL, [city] TEXT, [age] INTEGER NOT NULL)",
    );
    schema.execute_non_query()?;
    drop(schema);

    let contacts = ctx.query::<Contact>()?;
    for (name, city, age) in [
        ("Ada", Some("London"), 36),
        ("Grace", Some("New York"), 85),
        ("Linus", None, 54),
        ("Margaret", Some("Boston"), 33),
    ] {
        let mut contact = Contact {
            name: name.to_string(),
            city: city.map(str::to_string),
            age,
            ..Contact::default()
        };
        contacts.insert(&mut contact)?;
        info!(id = contact.id, name, "inserted contact");
    }
    ctx.save_changes()?;

    let over_forty = ctx
        .query::<Contact>()?
        .where_all([QueryFilter::gt(ContactField::Age, 40)])
        .order_by(ContactField::Age, false)?
        .select_many()?;
    for contact in &over_forty {
        info!(name = %contact.name, age = contact.age, "over forty");
    }

    let moved = ctx
        .query::<Contact>()?
        .where_any([
            QueryFilter::eq(ContactField::City, "Boston"),
            QueryFilter::contains(ContactField::City, "York"),
        ])
        .update_many([(ContactField::City, "Paris")])?;
    info!(rows = moved, "moved to Paris");

    let ada = ctx
        .query::<Contact>()?
        .where_all([QueryFilter::eq(ContactField::Name, "Ada")])
        .select_single()?;
    info!(?ada, "loaded");

    let total = ctx.query::<Contact>()?.count()?;
    info!(total, "contacts stored");

    ctx.save_changes()?;
    Ok(())
}
