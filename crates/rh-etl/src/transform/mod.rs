//! Record-to-row transforms
//!
//! One [`TableTransform`] per destination table turns a source [`Record`]
//! into zero or more destination rows plus [`Skip`]s. Transforms validate a
//! record completely before touching a registry, so dropped rows never
//! consume surrogate keys.

mod bridges;
mod dimensions;
mod facts;
pub mod split;

use crate::error::{EtlError, EtlResult};
use crate::registry::{KeyRegistrySet, SurrogateKey};
use rh_core::{
    Record, Requirement, Row, SkipReason, Strictness, TableSpec, Value, WarehouseContract,
    YearWindow,
};
use std::collections::{HashMap, HashSet};

pub use bridges::{
    CrewRole, CrewTransform, GenreBridgeTransform, PrincipalTransform, RegionBridgeTransform,
};
pub use dimensions::{
    EpisodeTransform, GenreTransform, PersonTransform, RegionTransform, TimeTransform,
    TitleTransform, TitleTypeTransform,
};
pub use facts::RatingsTransform;

/// Attributes of a loaded title needed by later tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleAttributes {
    pub start_year: Option<i64>,
    pub type_key: Option<SurrogateKey>,
}

/// A source row that produced no destination row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub reason: SkipReason,
    /// Natural key of the source row, when it has one
    pub source_key: Option<String>,
    /// The reference that failed to resolve, as `table=natural`
    pub reference: Option<String>,
    /// Data row number in the source file
    pub line: u64,
}

/// Output of one record
#[derive(Debug, Default)]
pub struct Transformed {
    pub rows: Vec<Row>,
    pub skips: Vec<Skip>,
}

impl Transformed {
    pub fn clear(&mut self) {
        self.rows.clear();
        self.skips.clear();
    }

    pub(crate) fn skip(
        &mut self,
        reason: SkipReason,
        record: &Record,
        source_key: Option<&str>,
        reference: Option<String>,
    ) {
        self.skips.push(Skip {
            reason,
            source_key: source_key.map(str::to_string),
            reference,
            line: record.line(),
        });
    }
}

/// Outcome of resolving one foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Resolved(SurrogateKey),
    /// Optional reference that did not resolve; the column becomes NULL
    Null,
    /// Mandatory reference that did not resolve; the row is dropped
    Missing,
}

impl Reference {
    pub fn value(self) -> Value {
        match self {
            Reference::Resolved(key) => Value::Int(key),
            Reference::Null | Reference::Missing => Value::Absent,
        }
    }
}

/// Fixed-size stand-in for the value that tells apart bridge rows sharing
/// both keys. Text values are interned per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BridgeDiscriminator {
    None,
    Int(i64),
    Text(u32),
}

/// State shared by the transforms of one run
#[derive(Debug)]
pub struct TransformContext {
    pub registries: KeyRegistrySet,
    pub strictness: Strictness,
    pub window: YearWindow,
    titles: HashMap<SurrogateKey, TitleAttributes>,
    bridge_seen: HashSet<(SurrogateKey, SurrogateKey, BridgeDiscriminator)>,
    discriminator_ids: HashMap<String, u32>,
}

impl TransformContext {
    pub fn new(contract: &WarehouseContract, strictness: Strictness, window: YearWindow) -> Self {
        Self {
            registries: KeyRegistrySet::for_contract(contract),
            strictness,
            window,
            titles: HashMap::new(),
            bridge_seen: HashSet::new(),
            discriminator_ids: HashMap::new(),
        }
    }

    /// Reset per-table state before a table starts
    pub fn begin_table(&mut self) {
        self.bridge_seen.clear();
        self.discriminator_ids.clear();
    }

    /// Resolve the foreign key `column` of `spec` for a natural key
    pub fn reference(
        &self,
        spec: &TableSpec,
        column: &str,
        natural: Option<&str>,
    ) -> EtlResult<Reference> {
        let fk = spec
            .foreign_key(column)
            .ok_or_else(|| EtlError::UnknownForeignKey {
                table: spec.name.to_string(),
                column: column.to_string(),
            })?;

        let key = match natural {
            Some(natural) => self.registries.lookup(fk.references.as_str(), natural)?,
            None => None,
        };

        Ok(match key {
            Some(key) => Reference::Resolved(key),
            None if self.is_mandatory(fk.requirement) => Reference::Missing,
            None => Reference::Null,
        })
    }

    /// Outcome of a foreign key with no value to look up
    pub fn unresolved(&self, spec: &TableSpec, column: &str) -> EtlResult<Reference> {
        self.reference(spec, column, None)
    }

    fn is_mandatory(&self, requirement: Requirement) -> bool {
        requirement == Requirement::Mandatory || self.strictness == Strictness::Strict
    }

    pub fn remember_title(&mut self, title_key: SurrogateKey, attributes: TitleAttributes) {
        self.titles.insert(title_key, attributes);
    }

    pub fn title(&self, title_key: SurrogateKey) -> Option<TitleAttributes> {
        self.titles.get(&title_key).copied()
    }

    /// `true` the first time a bridge composite is seen in the current table
    pub fn first_bridge_row(
        &mut self,
        left: SurrogateKey,
        right: SurrogateKey,
        discriminator: &Value,
    ) -> bool {
        let discriminator = self.intern(discriminator);
        self.bridge_seen.insert((left, right, discriminator))
    }

    /// Number of distinct bridge composites seen in the current table
    pub fn bridge_rows_seen(&self) -> usize {
        self.bridge_seen.len()
    }

    fn intern(&mut self, value: &Value) -> BridgeDiscriminator {
        match value {
            Value::Absent => BridgeDiscriminator::None,
            Value::Int(i) => BridgeDiscriminator::Int(*i),
            Value::Bool(b) => BridgeDiscriminator::Int(i64::from(*b)),
            Value::Text(text) => self.intern_text(text),
            Value::Float(f) => self.intern_text(&f.to_string()),
        }
    }

    fn intern_text(&mut self, text: &str) -> BridgeDiscriminator {
        if let Some(id) = self.discriminator_ids.get(text) {
            return BridgeDiscriminator::Text(*id);
        }
        let id = self.discriminator_ids.len() as u32;
        self.discriminator_ids.insert(text.to_string(), id);
        BridgeDiscriminator::Text(id)
    }
}

/// Builds a row in the table's insert-column order, truncating text to the
/// declared widths. Natural-key columns are stored as given; callers reject
/// keys that do not fit before building the row.
pub struct RowBuilder<'a> {
    spec: &'a TableSpec,
    values: Vec<Value>,
}

impl<'a> RowBuilder<'a> {
    pub fn new(spec: &'a TableSpec) -> Self {
        Self {
            spec,
            values: vec![Value::Absent; spec.columns.len()],
        }
    }

    pub fn set(mut self, column: &str, value: Value) -> Self {
        match self.spec.position(column) {
            Some(i) => {
                let column = &self.spec.columns[i];
                self.values[i] = match column.max_chars {
                    Some(width) if !self.spec.is_natural_key(column.name) => {
                        value.truncated(width)
                    }
                    _ => value,
                };
            }
            None => debug_assert!(false, "{} has no column '{}'", self.spec.name, column),
        }
        self
    }

    pub fn finish(self) -> Row {
        self.values
    }
}

/// Maps source records of one table
pub trait TableTransform: Send {
    /// Destination table
    fn spec(&self) -> &TableSpec;

    /// Transform one record, appending rows and skips to `out`
    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()>;
}

/// Transform for a contract table
pub fn for_table(spec: &TableSpec) -> EtlResult<Box<dyn TableTransform>> {
    let name = spec.name.to_string();
    let spec = spec.clone();
    let transform: Box<dyn TableTransform> = match name.as_str() {
        "dim_time" => Box::new(TimeTransform::new(spec)),
        "dim_title_type" => Box::new(TitleTypeTransform::new(spec)),
        "dim_genre" => Box::new(GenreTransform::new(spec)),
        "dim_person" => Box::new(PersonTransform::new(spec)),
        "dim_title" => Box::new(TitleTransform::new(spec)),
        "dim_episode" => Box::new(EpisodeTransform::new(spec)),
        "dim_region" => Box::new(RegionTransform::new(spec)),
        "bridge_title_genre" => Box::new(GenreBridgeTransform::new(spec)),
        "bridge_title_director" => Box::new(CrewTransform::new(spec, CrewRole::Director)),
        "bridge_title_writer" => Box::new(CrewTransform::new(spec, CrewRole::Writer)),
        "bridge_title_principal" => Box::new(PrincipalTransform::new(spec)),
        "bridge_title_region" => Box::new(RegionBridgeTransform::new(spec)),
        "fact_title_ratings" => Box::new(RatingsTransform::new(spec)),
        other => {
            return Err(EtlError::NoTransform {
                table: other.to_string(),
            })
        }
    };
    Ok(transform)
}

/// Value of the table's discriminator column in `record` as it will be
/// stored, or `Absent` when the table has none
pub(crate) fn discriminator(spec: &TableSpec, record: &Record) -> Value {
    let Some(column) = spec.discriminator else {
        return Value::Absent;
    };
    let value = record.get(column).clone();
    match spec.width(column) {
        Some(width) => value.truncated(width),
        None => value,
    }
}

/// Format a reference for skip records
pub(crate) fn describe_reference(table: &str, natural: Option<&str>) -> String {
    format!("{}={}", table, natural.unwrap_or("NULL"))
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
