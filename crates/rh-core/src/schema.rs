//! Destination warehouse contract
//!
//! The warehouse DDL is owned elsewhere; this module mirrors the parts of it
//! the loader relies on: table names, insert columns and their text widths,
//! surrogate and natural keys, foreign keys, and which source feeds each
//! table. The loader never creates or alters these tables.

use crate::dag::TableDag;
use crate::error::{CoreError, CoreResult};
use crate::source::SourceId;
use crate::table_name::TableName;
use std::fmt;

/// Role of a table in the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// Year-keyed dimension with derived attributes
    TimeDimension,
    /// Entity dimension with a surrogate and a natural key
    Dimension,
    /// Many-to-many association between two dimensions
    Bridge,
    /// Measures keyed to dimensions
    Fact,
}

impl TableKind {
    pub fn is_dimension(self) -> bool {
        matches!(self, TableKind::TimeDimension | TableKind::Dimension)
    }

    /// Position of the kind in the load sequence
    pub fn rank(self) -> u8 {
        match self {
            TableKind::TimeDimension => 0,
            TableKind::Dimension => 1,
            TableKind::Bridge => 2,
            TableKind::Fact => 3,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::TimeDimension => write!(f, "time dimension"),
            TableKind::Dimension => write!(f, "dimension"),
            TableKind::Bridge => write!(f, "bridge"),
            TableKind::Fact => write!(f, "fact"),
        }
    }
}

/// Whether an unresolved reference drops the row or nulls the column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Mandatory,
    Optional,
}

/// An insert column and, for text columns, its width in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub max_chars: Option<usize>,
}

/// A foreign key declared by the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: TableName,
    pub referenced_column: &'static str,
    pub requirement: Requirement,
}

/// One destination table
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: TableName,
    pub kind: TableKind,
    /// Surrogate key column, assigned by the loader
    pub surrogate_key: Option<&'static str>,
    /// Columns forming the natural key
    pub natural_key: Vec<&'static str>,
    /// Insert columns, in row order
    pub columns: Vec<ColumnSpec>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Extra column making bridge rows unique beyond the two keys
    pub discriminator: Option<&'static str>,
    /// Source file feeding the table; `None` for generated tables
    pub source: Option<SourceId>,
}

impl TableSpec {
    fn new(name: &str, kind: TableKind, source: Option<SourceId>) -> Self {
        Self {
            name: TableName::new(name),
            kind,
            surrogate_key: None,
            natural_key: Vec::new(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            discriminator: None,
            source,
        }
    }

    fn surrogate(mut self, column: &'static str) -> Self {
        self.surrogate_key = Some(column);
        self.columns.push(ColumnSpec {
            name: column,
            max_chars: None,
        });
        self
    }

    fn natural(mut self, columns: &[&'static str]) -> Self {
        self.natural_key = columns.to_vec();
        self
    }

    fn col(mut self, name: &'static str) -> Self {
        self.columns.push(ColumnSpec {
            name,
            max_chars: None,
        });
        self
    }

    fn text(mut self, name: &'static str, max_chars: usize) -> Self {
        self.columns.push(ColumnSpec {
            name,
            max_chars: Some(max_chars),
        });
        self
    }

    fn fk(
        mut self,
        column: &'static str,
        references: &str,
        referenced_column: &'static str,
        requirement: Requirement,
    ) -> Self {
        self.columns.push(ColumnSpec {
            name: column,
            max_chars: None,
        });
        self.foreign_keys.push(ForeignKey {
            column,
            references: TableName::new(references),
            referenced_column,
            requirement,
        });
        self
    }

    fn discriminated_by(mut self, column: &'static str) -> Self {
        self.discriminator = Some(column);
        self
    }

    /// Insert column names in row order
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Position of a column within the row
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    /// Declared text width of a column
    pub fn width(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .and_then(|c| c.max_chars)
    }

    pub fn is_natural_key(&self, column: &str) -> bool {
        self.natural_key.iter().any(|c| *c == column)
    }

    /// Whether a single-column natural key value fits its column. Keys
    /// longer than the column are never shortened, since two distinct keys
    /// could then share one stored value.
    pub fn natural_key_fits(&self, natural: &str) -> bool {
        match self.natural_key.as_slice() {
            [column] => self
                .width(column)
                .map_or(true, |width| natural.chars().count() <= width),
            _ => true,
        }
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Tables this one references
    pub fn dependencies(&self) -> impl Iterator<Item = &TableName> {
        self.foreign_keys.iter().map(|fk| &fk.references)
    }
}

/// The full set of destination tables
#[derive(Debug, Clone)]
pub struct WarehouseContract {
    tables: Vec<TableSpec>,
}

impl WarehouseContract {
    /// Build a contract from table specs, rejecting references to tables
    /// outside it and reference cycles.
    pub fn new(tables: Vec<TableSpec>) -> CoreResult<Self> {
        for table in &tables {
            for dep in table.dependencies() {
                if !tables.iter().any(|t| &t.name == dep) {
                    return Err(CoreError::DanglingContractReference {
                        table: table.name.to_string(),
                        references: dep.to_string(),
                    });
                }
            }
        }
        let contract = Self { tables };
        TableDag::build(&contract)?;
        Ok(contract)
    }

    /// The media catalog star schema
    pub fn catalog() -> CoreResult<Self> {
        use Requirement::{Mandatory, Optional};
        use TableKind::{Bridge, Dimension, Fact, TimeDimension};

        let tables = vec![
            TableSpec::new("dim_time", TimeDimension, None)
                .surrogate("time_key")
                .natural(&["year"])
                .col("year")
                .col("decade")
                .col("century"),
            TableSpec::new("dim_title_type", Dimension, Some(SourceId::TitleBasics))
                .surrogate("type_key")
                .natural(&["title_type"])
                .text("title_type", 50),
            TableSpec::new("dim_genre", Dimension, Some(SourceId::TitleBasics))
                .surrogate("genre_key")
                .natural(&["genre_name"])
                .text("genre_name", 50),
            TableSpec::new("dim_person", Dimension, Some(SourceId::NameBasics))
                .surrogate("person_key")
                .natural(&["nconst"])
                .text("nconst", 12)
                .text("primary_name", 255)
                .col("birth_year")
                .col("death_year")
                .text("primary_profession", 255)
                .col("known_for_titles"),
            TableSpec::new("dim_title", Dimension, Some(SourceId::TitleBasics))
                .surrogate("title_key")
                .natural(&["tconst"])
                .text("tconst", 12)
                .fk("type_key", "dim_title_type", "type_key", Mandatory)
                .text("primary_title", 255)
                .text("original_title", 255)
                .col("is_adult")
                .col("start_year")
                .col("end_year")
                .col("runtime_minutes"),
            TableSpec::new("dim_episode", Dimension, Some(SourceId::TitleEpisode))
                .surrogate("episode_key")
                .natural(&["tconst"])
                .text("tconst", 12)
                .fk("parent_title_key", "dim_title", "title_key", Mandatory)
                .col("season_number")
                .col("episode_number"),
            TableSpec::new("dim_region", Dimension, Some(SourceId::TitleAkas))
                .surrogate("region_key")
                .natural(&["region", "language", "types", "attributes"])
                .text("region", 10)
                .text("language", 10)
                .text("types", 100)
                .text("attributes", 255),
            TableSpec::new("bridge_title_genre", Bridge, Some(SourceId::TitleBasics))
                .fk("title_key", "dim_title", "title_key", Mandatory)
                .fk("genre_key", "dim_genre", "genre_key", Mandatory),
            TableSpec::new("bridge_title_director", Bridge, Some(SourceId::TitleCrew))
                .fk("title_key", "dim_title", "title_key", Mandatory)
                .fk("person_key", "dim_person", "person_key", Mandatory),
            TableSpec::new("bridge_title_writer", Bridge, Some(SourceId::TitleCrew))
                .fk("title_key", "dim_title", "title_key", Mandatory)
                .fk("person_key", "dim_person", "person_key", Mandatory),
            TableSpec::new(
                "bridge_title_principal",
                Bridge,
                Some(SourceId::TitlePrincipals),
            )
            .fk("title_key", "dim_title", "title_key", Mandatory)
            .fk("person_key", "dim_person", "person_key", Mandatory)
            .text("category", 100)
            .col("ordering")
            .text("job", 255)
            .col("characters")
            .discriminated_by("category"),
            TableSpec::new("bridge_title_region", Bridge, Some(SourceId::TitleAkas))
                .fk("title_key", "dim_title", "title_key", Mandatory)
                .fk("region_key", "dim_region", "region_key", Mandatory)
                .col("ordering")
                .text("title", 255)
                .col("is_original_title")
                .discriminated_by("ordering"),
            TableSpec::new("fact_title_ratings", Fact, Some(SourceId::TitleRatings))
                .surrogate("rating_key")
                .natural(&["tconst"])
                .text("tconst", 12)
                .fk("title_key", "dim_title", "title_key", Mandatory)
                .fk("time_key", "dim_time", "time_key", Optional)
                .fk("type_key", "dim_title_type", "type_key", Optional)
                .col("average_rating")
                .col("num_votes"),
        ];

        Self::new(tables)
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> CoreResult<&TableSpec> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CoreError::UnknownTable {
                name: name.to_string(),
            })
    }

    /// Declaration index, used to break ties in the load order
    pub(crate) fn declaration_index(&self, name: &str) -> usize {
        self.tables
            .iter()
            .position(|t| t.name == name)
            .unwrap_or(usize::MAX)
    }

    /// Tables in load order: referenced tables before referencing ones,
    /// dimensions before bridges before facts.
    pub fn load_order(&self) -> CoreResult<Vec<&TableSpec>> {
        let dag = TableDag::build(self)?;
        let order = dag.load_order(self)?;
        let specs = order
            .iter()
            .map(|name| self.table(name.as_str()))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut previous: Option<TableKind> = None;
        for spec in &specs {
            if let Some(prev) = previous {
                if spec.kind.rank() < prev.rank() {
                    return Err(CoreError::PhaseOrder {
                        table: spec.name.to_string(),
                        kind: spec.kind.to_string(),
                        previous: prev.to_string(),
                    });
                }
            }
            previous = Some(spec.kind);
        }
        Ok(specs)
    }

    /// Tables in truncation order: referencing tables first
    pub fn truncate_order(&self) -> CoreResult<Vec<&TableSpec>> {
        let mut order = self.load_order()?;
        order.reverse();
        Ok(order)
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
