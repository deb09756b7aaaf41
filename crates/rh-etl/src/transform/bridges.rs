//! Bridge transforms
//!
//! Bridges relate a title to another dimension. Both keys are mandatory; a
//! pair that does not resolve is skipped as an unresolved reference. Each
//! (title, other, discriminator) combination is kept once per table.

use super::dimensions::{region_key, region_parts};
use super::split::split_list;
use super::{
    describe_reference, discriminator, Reference, RowBuilder, TableTransform, TransformContext,
    Transformed,
};
use crate::error::EtlResult;
use crate::registry::SurrogateKey;
use rh_core::{Record, SkipReason, TableSpec, Value};

/// Resolve the two keys of a bridge row.
///
/// Records an unresolved-reference skip and returns `None` when either side
/// is missing; the left side is reported first.
fn resolve_pair(
    spec: &TableSpec,
    ctx: &TransformContext,
    out: &mut Transformed,
    record: &Record,
    source_key: Option<&str>,
    left: (&str, Option<&str>),
    right: (&str, Option<&str>),
) -> EtlResult<Option<(SurrogateKey, SurrogateKey)>> {
    let left_ref = ctx.reference(spec, left.0, left.1)?;
    let right_ref = ctx.reference(spec, right.0, right.1)?;

    match (left_ref, right_ref) {
        (Reference::Resolved(l), Reference::Resolved(r)) => Ok(Some((l, r))),
        (Reference::Resolved(_), _) => {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                source_key,
                Some(referenced(spec, right.0, right.1)),
            );
            Ok(None)
        }
        _ => {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                source_key,
                Some(referenced(spec, left.0, left.1)),
            );
            Ok(None)
        }
    }
}

fn referenced(spec: &TableSpec, column: &str, natural: Option<&str>) -> String {
    let table = spec
        .foreign_key(column)
        .map(|fk| fk.references.as_str())
        .unwrap_or(column);
    describe_reference(table, natural)
}

/// `bridge_title_genre`: one row per element of `genres`
pub struct GenreBridgeTransform {
    spec: TableSpec,
}

impl GenreBridgeTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for GenreBridgeTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let tconst = record.text("tconst");
        for genre in split_list(record.text("genres")) {
            let Some((title_key, genre_key)) = resolve_pair(
                &self.spec,
                ctx,
                out,
                record,
                tconst,
                ("title_key", tconst),
                ("genre_key", Some(genre)),
            )?
            else {
                continue;
            };

            if !ctx.first_bridge_row(title_key, genre_key, &discriminator(&self.spec, record)) {
                out.skip(SkipReason::DuplicateKey, record, tconst, None);
                continue;
            }
            out.rows.push(
                RowBuilder::new(&self.spec)
                    .set("title_key", Value::Int(title_key))
                    .set("genre_key", Value::Int(genre_key))
                    .finish(),
            );
        }
        Ok(())
    }
}

/// Which crew list of `title.crew` a bridge reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrewRole {
    Director,
    Writer,
}

impl CrewRole {
    pub fn source_column(self) -> &'static str {
        match self {
            CrewRole::Director => "directors",
            CrewRole::Writer => "writers",
        }
    }
}

/// `bridge_title_director` and `bridge_title_writer`
pub struct CrewTransform {
    spec: TableSpec,
    role: CrewRole,
}

impl CrewTransform {
    pub fn new(spec: TableSpec, role: CrewRole) -> Self {
        Self { spec, role }
    }
}

impl TableTransform for CrewTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let tconst = record.text("tconst");
        for nconst in split_list(record.text(self.role.source_column())) {
            let Some((title_key, person_key)) = resolve_pair(
                &self.spec,
                ctx,
                out,
                record,
                tconst,
                ("title_key", tconst),
                ("person_key", Some(nconst)),
            )?
            else {
                continue;
            };

            if !ctx.first_bridge_row(title_key, person_key, &discriminator(&self.spec, record)) {
                out.skip(SkipReason::DuplicateKey, record, tconst, None);
                continue;
            }
            out.rows.push(
                RowBuilder::new(&self.spec)
                    .set("title_key", Value::Int(title_key))
                    .set("person_key", Value::Int(person_key))
                    .finish(),
            );
        }
        Ok(())
    }
}

/// `bridge_title_principal` from `title.principals`, distinct per category
pub struct PrincipalTransform {
    spec: TableSpec,
}

impl PrincipalTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for PrincipalTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let tconst = record.text("tconst");
        if record.text("category").is_none() {
            out.skip(SkipReason::Malformed, record, tconst, None);
            return Ok(());
        }

        let Some((title_key, person_key)) = resolve_pair(
            &self.spec,
            ctx,
            out,
            record,
            tconst,
            ("title_key", tconst),
            ("person_key", record.text("nconst")),
        )?
        else {
            return Ok(());
        };

        let category = discriminator(&self.spec, record);
        if !ctx.first_bridge_row(title_key, person_key, &category) {
            out.skip(SkipReason::DuplicateKey, record, tconst, None);
            return Ok(());
        }

        out.rows.push(
            RowBuilder::new(&self.spec)
                .set("title_key", Value::Int(title_key))
                .set("person_key", Value::Int(person_key))
                .set("category", category)
                .set("ordering", record.get("ordering").clone())
                .set("job", record.get("job").clone())
                .set("characters", record.get("characters").clone())
                .finish(),
        );
        Ok(())
    }
}

/// `bridge_title_region` from `title.akas`, distinct per ordering
pub struct RegionBridgeTransform {
    spec: TableSpec,
}

impl RegionBridgeTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for RegionBridgeTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let title_id = record.text("titleId");
        let region = region_key(&region_parts(record));

        let Some((title_key, region_key)) = resolve_pair(
            &self.spec,
            ctx,
            out,
            record,
            title_id,
            ("title_key", title_id),
            ("region_key", Some(region.as_str())),
        )?
        else {
            return Ok(());
        };

        if !ctx.first_bridge_row(title_key, region_key, &discriminator(&self.spec, record)) {
            out.skip(SkipReason::DuplicateKey, record, title_id, None);
            return Ok(());
        }

        out.rows.push(
            RowBuilder::new(&self.spec)
                .set("title_key", Value::Int(title_key))
                .set("region_key", Value::Int(region_key))
                .set("ordering", record.get("ordering").clone())
                .set("title", record.get("title").clone())
                .set(
                    "is_original_title",
                    Value::Int(record.int("isOriginalTitle").unwrap_or(0)),
                )
                .finish(),
        );
        Ok(())
    }
}
