//! Contact entity, bindings and schema shared by the SQLite tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use oxide_store::{
    BindingRegistry, CommandProvider, SqlValue, StorageContext, TableFieldDescriptor, ToSqlValue,
};
use oxide_store_derive::Entity;
use oxide_store_sqlite::{SqliteConnection, SqliteDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Free,
    Gold,
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Free" | "0" => Ok(Self::Free),
            "Gold" | "1" => Ok(Self::Gold),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

impl ToSqlValue for Tier {
    fn to_sql_value(self) -> SqlValue {
        let name = match self {
            Self::Free => "Free",
            Self::Gold => "Gold",
        };
        SqlValue::Text(name.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactField {
    Id,
    Name,
    Age,
    Email,
    Tier,
    Joined,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[storage(key = ContactField)]
pub struct Contact {
    #[primary_key(identity)]
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
    #[storage(text_enum)]
    pub tier: Option<Tier>,
    pub joined: Option<NaiveDate>,
}

impl Contact {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.to_string(),
            age,
            ..Self::default()
        }
    }
}

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS [Contact] (\
    [id] INTEGER PRIMARY KEY AUTOINCREMENT, \
    [full_name] TEXT NOT NULL DEFAULT '', \
    [age] INTEGER NOT NULL DEFAULT 0, \
    [email] TEXT, \
    [tier] TEXT, \
    [joined] TEXT)";

pub fn registry() -> Arc<BindingRegistry> {
    let mut builder = BindingRegistry::builder();
    builder
        .register::<Contact, _>(
            "Contact",
            [
                TableFieldDescriptor::new(ContactField::Id, "id").unwrap(),
                TableFieldDescriptor::with_column(ContactField::Name, "name", Some("full_name"))
                    .unwrap(),
                TableFieldDescriptor::new(ContactField::Age, "age").unwrap(),
                TableFieldDescriptor::new(ContactField::Email, "email").unwrap(),
                TableFieldDescriptor::new(ContactField::Tier, "tier").unwrap(),
                TableFieldDescriptor::new(ContactField::Joined, "joined").unwrap(),
            ],
        )
        .unwrap();
    Arc::new(builder.build())
}

/// Opens a context and makes sure the schema exists.
pub fn open(connection_string: &str) -> StorageContext<SqliteConnection> {
    let ctx = StorageContext::with_registry(&SqliteDriver::new(), connection_string, registry())
        .unwrap();
    let mut command = ctx.create_command().unwrap();
    command.set_text(SCHEMA);
    command.execute_non_query().unwrap();
    drop(command);
    ctx.save_changes().unwrap();
    ctx
}

pub fn open_memory() -> StorageContext<SqliteConnection> {
    open("Data Source=:memory:")
}

/// Inserts contacts and commits them.
pub fn seed(ctx: &StorageContext<SqliteConnection>, people: &[(&str, i32)]) -> Vec<Contact> {
    let query = ctx.query::<Contact>().unwrap();
    let stored = people
        .iter()
        .map(|&(name, age)| {
            let mut contact = Contact::new(name, age);
            query.insert(&mut contact).unwrap();
            contact
        })
        .collect();
    ctx.save_changes().unwrap();
    stored
}
