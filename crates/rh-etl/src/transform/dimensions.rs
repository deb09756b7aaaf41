//! Dimension transforms

use super::split::split_list;
use super::{
    describe_reference, Reference, RowBuilder, TableTransform, TitleAttributes, TransformContext,
    Transformed,
};
use crate::error::EtlResult;
use crate::registry::NaturalKey;
use rh_core::{
    ColumnDef, ColumnType, Record, RecordShape, SkipReason, TableSpec, TimeAttributes, Value,
};

/// Source columns of a region tuple and their widths in `dim_region`
pub(crate) const REGION_COLUMNS: [(&str, usize); 4] = [
    ("region", 10),
    ("language", 10),
    ("types", 100),
    ("attributes", 255),
];

/// Region tuple of an akas record, truncated to the dimension's widths
pub(crate) fn region_parts(record: &Record) -> Vec<Option<String>> {
    REGION_COLUMNS
        .iter()
        .map(|(column, width)| record.text(column).map(|s| s.chars().take(*width).collect()))
        .collect()
}

pub(crate) fn region_key(parts: &[Option<String>]) -> String {
    let parts: Vec<Option<&str>> = parts.iter().map(Option::as_deref).collect();
    NaturalKey::composite(&parts)
}

/// `dim_time`: one row per year of the configured window and extra years
pub struct TimeTransform {
    spec: TableSpec,
}

impl TimeTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }

    /// Shape of the generated year records
    pub fn shape() -> RecordShape {
        RecordShape::new(vec![ColumnDef::new("year", ColumnType::Int)], b'\t', "\\N")
    }
}

impl TableTransform for TimeTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let Some(year) = record.int("year") else {
            out.skip(SkipReason::Malformed, record, None, None);
            return Ok(());
        };

        let natural = year.to_string();
        let resolution = ctx.registries.resolve(self.spec.name.as_str(), &natural)?;
        if !resolution.inserted {
            out.skip(SkipReason::DuplicateKey, record, Some(&natural), None);
            return Ok(());
        }

        let attrs = TimeAttributes::derive(year, ctx.window);
        out.rows.push(
            RowBuilder::new(&self.spec)
                .set("time_key", Value::Int(resolution.key))
                .set("year", Value::Int(year))
                .set("decade", Value::int(attrs.decade))
                .set("century", Value::int(attrs.century))
                .finish(),
        );
        Ok(())
    }
}

/// `dim_title_type`: distinct `titleType` values of `title.basics`
pub struct TitleTypeTransform {
    spec: TableSpec,
}

impl TitleTypeTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for TitleTypeTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let Some(title_type) = record.text("titleType") else {
            return Ok(());
        };
        if !self.spec.natural_key_fits(title_type) {
            out.skip(SkipReason::Malformed, record, Some(title_type), None);
            return Ok(());
        }
        let resolution = ctx.registries.resolve(self.spec.name.as_str(), title_type)?;
        if resolution.inserted {
            out.rows.push(
                RowBuilder::new(&self.spec)
                    .set("type_key", Value::Int(resolution.key))
                    .set("title_type", Value::text(Some(title_type)))
                    .finish(),
            );
        }
        Ok(())
    }
}

/// `dim_genre`: distinct elements of the `genres` lists of `title.basics`
pub struct GenreTransform {
    spec: TableSpec,
}

impl GenreTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for GenreTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        for genre in split_list(record.text("genres")) {
            if !self.spec.natural_key_fits(genre) {
                out.skip(SkipReason::Malformed, record, Some(genre), None);
                continue;
            }
            let resolution = ctx.registries.resolve(self.spec.name.as_str(), genre)?;
            if resolution.inserted {
                out.rows.push(
                    RowBuilder::new(&self.spec)
                        .set("genre_key", Value::Int(resolution.key))
                        .set("genre_name", Value::text(Some(genre)))
                        .finish(),
                );
            }
        }
        Ok(())
    }
}

/// `dim_person` from `name.basics`
pub struct PersonTransform {
    spec: TableSpec,
}

impl PersonTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for PersonTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let Some(nconst) = record.text("nconst") else {
            out.skip(SkipReason::Malformed, record, None, None);
            return Ok(());
        };
        if !self.spec.natural_key_fits(nconst) {
            out.skip(SkipReason::Malformed, record, Some(nconst), None);
            return Ok(());
        }

        let resolution = ctx.registries.resolve(self.spec.name.as_str(), nconst)?;
        if !resolution.inserted {
            out.skip(SkipReason::DuplicateKey, record, Some(nconst), None);
            return Ok(());
        }

        out.rows.push(
            RowBuilder::new(&self.spec)
                .set("person_key", Value::Int(resolution.key))
                .set("nconst", Value::text(Some(nconst)))
                .set("primary_name", record.get("primaryName").clone())
                .set("birth_year", record.get("birthYear").clone())
                .set("death_year", record.get("deathYear").clone())
                .set("primary_profession", record.get("primaryProfession").clone())
                .set("known_for_titles", record.get("knownForTitles").clone())
                .finish(),
        );
        Ok(())
    }
}

/// `dim_title` from `title.basics`.
///
/// Titles without a start year inside the year window are dropped as out of
/// range. Loaded titles are remembered for the ratings fact.
pub struct TitleTransform {
    spec: TableSpec,
}

impl TitleTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for TitleTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let Some(tconst) = record.text("tconst") else {
            out.skip(SkipReason::Malformed, record, None, None);
            return Ok(());
        };
        if !self.spec.natural_key_fits(tconst) {
            out.skip(SkipReason::Malformed, record, Some(tconst), None);
            return Ok(());
        }

        let start_year = record.int("startYear");
        if !start_year.is_some_and(|year| ctx.window.contains(year)) {
            out.skip(SkipReason::OutOfRange, record, Some(tconst), None);
            return Ok(());
        }

        let title_type = record.text("titleType");
        let type_ref = ctx.reference(&self.spec, "type_key", title_type)?;
        if type_ref == Reference::Missing {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                Some(tconst),
                Some(describe_reference("dim_title_type", title_type)),
            );
            return Ok(());
        }

        let resolution = ctx.registries.resolve(self.spec.name.as_str(), tconst)?;
        if !resolution.inserted {
            out.skip(SkipReason::DuplicateKey, record, Some(tconst), None);
            return Ok(());
        }

        let type_key = match type_ref {
            Reference::Resolved(key) => Some(key),
            _ => None,
        };
        ctx.remember_title(
            resolution.key,
            TitleAttributes {
                start_year,
                type_key,
            },
        );

        out.rows.push(
            RowBuilder::new(&self.spec)
                .set("title_key", Value::Int(resolution.key))
                .set("tconst", Value::text(Some(tconst)))
                .set("type_key", type_ref.value())
                .set("primary_title", record.get("primaryTitle").clone())
                .set("original_title", record.get("originalTitle").clone())
                .set("is_adult", Value::Int(record.int("isAdult").unwrap_or(0)))
                .set("start_year", Value::int(start_year))
                .set("end_year", record.get("endYear").clone())
                .set("runtime_minutes", record.get("runtimeMinutes").clone())
                .finish(),
        );
        Ok(())
    }
}

/// `dim_episode` from `title.episode`
pub struct EpisodeTransform {
    spec: TableSpec,
}

impl EpisodeTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for EpisodeTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let Some(tconst) = record.text("tconst") else {
            out.skip(SkipReason::Malformed, record, None, None);
            return Ok(());
        };
        if !self.spec.natural_key_fits(tconst) {
            out.skip(SkipReason::Malformed, record, Some(tconst), None);
            return Ok(());
        }

        let parent = record.text("parentTconst");
        let parent_ref = ctx.reference(&self.spec, "parent_title_key", parent)?;
        if parent_ref == Reference::Missing {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                Some(tconst),
                Some(describe_reference("dim_title", parent)),
            );
            return Ok(());
        }

        let resolution = ctx.registries.resolve(self.spec.name.as_str(), tconst)?;
        if !resolution.inserted {
            out.skip(SkipReason::DuplicateKey, record, Some(tconst), None);
            return Ok(());
        }

        out.rows.push(
            RowBuilder::new(&self.spec)
                .set("episode_key", Value::Int(resolution.key))
                .set("tconst", Value::text(Some(tconst)))
                .set("parent_title_key", parent_ref.value())
                .set("season_number", record.get("seasonNumber").clone())
                .set("episode_number", record.get("episodeNumber").clone())
                .finish(),
        );
        Ok(())
    }
}

/// `dim_region`: distinct (region, language, types, attributes) tuples of
/// `title.akas`
pub struct RegionTransform {
    spec: TableSpec,
}

impl RegionTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for RegionTransform {
    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn apply(
        &mut self,
        record: &Record,
        ctx: &mut TransformContext,
        out: &mut Transformed,
    ) -> EtlResult<()> {
        let parts = region_parts(record);
        let resolution = ctx
            .registries
            .resolve(self.spec.name.as_str(), &region_key(&parts))?;
        if !resolution.inserted {
            return Ok(());
        }

        let mut row = RowBuilder::new(&self.spec).set("region_key", Value::Int(resolution.key));
        for ((column, _), part) in REGION_COLUMNS.iter().zip(parts) {
            row = row.set(column, Value::text(part.as_deref()));
        }
        out.rows.push(row.finish());
        Ok(())
    }
}
