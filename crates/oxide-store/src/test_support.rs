//! Shared fixtures for unit tests.

use crate::descriptor::TableFieldDescriptor;
use crate::entity::{Entity, FieldAccessor};
use crate::value::{FromSqlValue, ToSqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonField {
    Id,
    Name,
    Age,
    Nickname,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub nickname: Option<String>,
}

impl Entity for Person {
    type Key = PersonField;

    fn accessors() -> Vec<FieldAccessor<Self>> {
        vec![
            FieldAccessor::new(
                "Id",
                |p: &Self| p.id.to_sql_value(),
                |p: &mut Self, v| {
                    p.id = FromSqlValue::from_sql_value(v)?;
                    Ok(())
                },
            )
            .primary_key(true),
            FieldAccessor::new(
                "Name",
                |p: &Self| p.name.clone().to_sql_value(),
                |p: &mut Self, v| {
                    p.name = FromSqlValue::from_sql_value(v)?;
                    Ok(())
                },
            ),
            FieldAccessor::new(
                "Age",
                |p: &Self| p.age.to_sql_value(),
                |p: &mut Self, v| {
                    p.age = FromSqlValue::from_sql_value(v)?;
                    Ok(())
                },
            ),
            FieldAccessor::new(
                "Nickname",
                |p: &Self| p.nickname.clone().to_sql_value(),
                |p: &mut Self, v| {
                    p.nickname = FromSqlValue::from_sql_value(v)?;
                    Ok(())
                },
            ),
        ]
    }
}

/// `Id` is stored in `person_id`; the rest keep their field names.
pub fn descriptors() -> Vec<TableFieldDescriptor<PersonField>> {
    vec![
        TableFieldDescriptor::with_column(PersonField::Id, "Id", Some("person_id")).unwrap(),
        TableFieldDescriptor::new(PersonField::Name, "Name").unwrap(),
        TableFieldDescriptor::new(PersonField::Age, "Age").unwrap(),
        TableFieldDescriptor::new(PersonField::Nickname, "Nickname").unwrap(),
    ]
}
