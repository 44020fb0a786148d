//! Record traits and INSERT statement generation.

use serde::de::DeserializeOwned;

use crate::{Arg, Result, TursoError};

/// A record type that query results can decode into.
///
/// [`column_map`](Queryable::column_map) declares field-name → wire-column-name
/// overrides for columns whose database name differs from the field name.
/// Unlisted columns decode under their wire name unchanged.
///
/// ```
/// use serde::Deserialize;
/// use turso_http::Queryable;
///
/// #[derive(Deserialize)]
/// struct User {
///     identify: String,
///     name: String,
///     email_address: String,
/// }
///
/// impl Queryable for User {
///     fn column_map() -> &'static [(&'static str, &'static str)] {
///         &[
///             ("identify", "id"),
///             ("name", "username"),
///             ("email_address", "email"),
///         ]
///     }
/// }
/// ```
pub trait Queryable: DeserializeOwned {
    /// Field-name to wire-column-name overrides. Empty means names match.
    fn column_map() -> &'static [(&'static str, &'static str)] {
        &[]
    }
}

/// A record type that can be written with generated INSERT statements.
///
/// [`insert_values`](Insertable::insert_values) returns an ordered
/// column-name → argument list; the order drives the generated column list,
/// so it must be the same for every instance of the type.
pub trait Insertable: Queryable {
    /// Table the records insert into.
    fn table() -> &'static str;

    /// Ordered column-name → argument pairs for this record.
    fn insert_values(&self) -> Vec<(&'static str, Arg)>;
}

/// Generates `INSERT INTO t (c1, c2) VALUES (?, ?)` for one record.
pub(crate) fn insert_sql_one<T: Insertable>(object: &T) -> (String, Vec<Arg>) {
    let (columns, args): (Vec<_>, Vec<_>) = object.insert_values().into_iter().unzip();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::table(),
        columns.join(", "),
        placeholder_group(columns.len()),
    );
    (sql, args)
}

/// Generates one multi-row INSERT for a non-empty list of records.
///
/// The first record's column names set the canonical order; a record whose
/// column names differ would silently misalign values, so it is rejected.
pub(crate) fn insert_sql_many<T: Insertable>(objects: &[T]) -> Result<(String, Vec<Arg>)> {
    let first = objects.first().ok_or(TursoError::NoRows)?;
    let columns: Vec<&str> = first
        .insert_values()
        .into_iter()
        .map(|(column, _)| column)
        .collect();

    let mut args = Vec::with_capacity(objects.len() * columns.len());
    for (index, object) in objects.iter().enumerate() {
        let values = object.insert_values();
        let names: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
        if names != columns {
            return Err(TursoError::InvalidValue(format!(
                "record {index} declares columns ({}) but the first record declares ({})",
                names.join(", "),
                columns.join(", "),
            )));
        }
        args.extend(values.into_iter().map(|(_, arg)| arg));
    }

    let groups = vec![format!("({})", placeholder_group(columns.len())); objects.len()];
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        T::table(),
        columns.join(", "),
        groups.join(", "),
    );
    Ok((sql, args))
}

fn placeholder_group(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Accumulates inserts for several tables into one request.
///
/// Each [`add`](MultiTableInsert::add) call appends one generated INSERT for
/// a homogeneous list of records; [`crate::Database::multi_table_insert`]
/// sends all of them inside a single transaction.
#[derive(Debug, Default)]
pub struct MultiTableInsert {
    inserts: Vec<(String, Vec<Arg>)>,
}

impl MultiTableInsert {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an insert for one table. An empty list appends nothing.
    pub fn add<T: Insertable>(mut self, objects: &[T]) -> Result<Self> {
        if objects.is_empty() {
            return Ok(self);
        }
        self.inserts.push(insert_sql_many(objects)?);
        Ok(self)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inserts.is_empty()
    }

    pub(crate) fn into_inserts(self) -> Vec<(String, Vec<Arg>)> {
        self.inserts
    }
}
