//! Entity declarations and the SQL DDL derived from them.
//! SQLite-first design; can be adapted for other RDBMS.

/// Column storage type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
}

impl FieldType {
    pub fn sql(self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer => "INTEGER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub non_empty: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            unique: false,
            non_empty: false,
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    pub const fn non_empty(self) -> Self {
        Self {
            non_empty: true,
            ..self
        }
    }

    /// The column-level CHECK clause, if the field carries one.
    pub fn check_sql(&self) -> Option<String> {
        self.non_empty
            .then(|| format!("CHECK (length({}) > 0)", self.name))
    }

    fn column_sql(&self) -> String {
        let mut col = format!("{} {}", self.name, self.ty.sql());
        if !self.nullable {
            col.push_str(" NOT NULL");
        }
        if let Some(check) = self.check_sql() {
            col.push(' ');
            col.push_str(&check);
        }
        if self.unique {
            col.push_str(" UNIQUE");
        }
        col
    }
}

/// A named entity and its ordered fields.
///
/// Every entity also gets the implicit columns `id`, `createdAt` and
/// `updatedAt`; these are not part of `fields`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "createdAt";
pub const UPDATED_AT_COLUMN: &str = "updatedAt";

impl EntitySpec {
    pub const fn define(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    /// Backing table name: the entity name pluralized (`User` -> `Users`).
    pub fn table_name(&self) -> String {
        format!("{}s", self.name)
    }

    /// Every column the live table must carry, in declaration order.
    pub fn column_names(&self) -> Vec<&'static str> {
        let mut cols = Vec::with_capacity(self.fields.len() + 3);
        cols.push(ID_COLUMN);
        cols.extend(self.fields.iter().map(|f| f.name));
        cols.push(CREATED_AT_COLUMN);
        cols.push(UPDATED_AT_COLUMN);
        cols
    }

    pub fn create_table_sql(&self) -> String {
        let mut cols = vec![format!("{ID_COLUMN} INTEGER PRIMARY KEY AUTOINCREMENT")];
        cols.extend(self.fields.iter().map(FieldSpec::column_sql));
        cols.push(format!("{CREATED_AT_COLUMN} TEXT NOT NULL")); // RFC3339
        cols.push(format!("{UPDATED_AT_COLUMN} TEXT NOT NULL")); // RFC3339
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table_name(),
            cols.join(",\n    ")
        )
    }
}

/// The `User` entity:
/// - `username` TEXT, required, non-empty, UNIQUE
/// - `password` TEXT, required, stored as given
pub const USER_ENTITY: EntitySpec = EntitySpec::define(
    "User",
    &[
        FieldSpec::required("username", FieldType::Text)
            .non_empty()
            .unique(),
        FieldSpec::required("password", FieldType::Text),
    ],
);
