//! Convert SqlValue to a type that sqlx can bind against sqlite.

use crate::value::SqlValue;
use sqlx::encode::{Encode, IsNull};
use sqlx::sqlite::Sqlite;
use sqlx::Database;

/// A value bindable into a sqlite query. Converts from [`SqlValue`].
#[derive(Clone, Debug)]
pub enum SqliteBindValue {
    Null,
    Bool(bool),
    F64(f64),
    Text(String),
}

impl SqliteBindValue {
    pub fn from_value(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => SqliteBindValue::Null,
            SqlValue::Boolean(b) => SqliteBindValue::Bool(*b),
            SqlValue::Number(n) => SqliteBindValue::F64(*n),
            SqlValue::Text(s) => SqliteBindValue::Text(s.clone()),
        }
    }
}

impl<'q> Encode<'q, Sqlite> for SqliteBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqliteBindValue::Null => {
                <Option<i32> as Encode<Sqlite>>::encode_by_ref(&None, buf)?
            }
            SqliteBindValue::Bool(b) => <bool as Encode<Sqlite>>::encode_by_ref(b, buf)?,
            SqliteBindValue::F64(n) => <f64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            SqliteBindValue::Text(s) => <String as Encode<Sqlite>>::encode_by_ref(s, buf)?,
        })
    }
}

impl sqlx::Type<Sqlite> for SqliteBindValue {
    fn type_info() -> <Sqlite as Database>::TypeInfo {
        <str as sqlx::Type<Sqlite>>::type_info()
    }
}
