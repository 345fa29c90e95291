//! Schema source injected into the SQL toolkit

use crate::database::SchemaDescription;

/// Supplies table names and schema text to the SQL tools
pub trait SchemaProvider: Send + Sync {
    /// Qualified names of the usable tables
    fn list_tables(&self) -> Vec<String>;

    /// Schema text for the given tables, or for every table when `None`
    fn describe(&self, tables: Option<&[String]>) -> String;
}

/// A [`SchemaProvider`] over a description computed ahead of time
#[derive(Debug, Clone)]
pub struct PrecomputedSchema {
    schema: SchemaDescription,
}

impl PrecomputedSchema {
    pub fn new(schema: SchemaDescription) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }
}

impl SchemaProvider for PrecomputedSchema {
    fn list_tables(&self) -> Vec<String> {
        self.schema.table_names.clone()
    }

    /// Known tables are rendered individually; when none of the requested
    /// names are known the whole description is returned.
    fn describe(&self, tables: Option<&[String]>) -> String {
        let Some(names) = tables else {
            return self.schema.description.clone();
        };

        let sections: Vec<String> = names
            .iter()
            .filter_map(|name| self.schema.find(name))
            .flat_map(|table| table.sections())
            .collect();

        if sections.is_empty() {
            self.schema.description.clone()
        } else {
            sections.join("\n\n")
        }
    }
}
