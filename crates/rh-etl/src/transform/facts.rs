//! Ratings fact transform

use super::{
    describe_reference, Reference, RowBuilder, TableTransform, TransformContext, Transformed,
};
use crate::error::EtlResult;
use rh_core::{Record, SkipReason, TableSpec, Value};

/// `fact_title_ratings` from `title.ratings`.
///
/// The title is mandatory. Time and title type come from the loaded title:
/// its start year and its type key. They are optional unless the run is
/// strict.
pub struct RatingsTransform {
    spec: TableSpec,
}

impl RatingsTransform {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }
}

impl TableTransform for RatingsTransform {
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

        let Reference::Resolved(title_key) = ctx.reference(&self.spec, "title_key", Some(tconst))?
        else {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                Some(tconst),
                Some(describe_reference("dim_title", Some(tconst))),
            );
            return Ok(());
        };

        let title = ctx.title(title_key);
        let year = title.and_then(|t| t.start_year).map(|y| y.to_string());
        let time_ref = ctx.reference(&self.spec, "time_key", year.as_deref())?;
        if time_ref == Reference::Missing {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                Some(tconst),
                Some(describe_reference("dim_time", year.as_deref())),
            );
            return Ok(());
        }

        let type_ref = match title.and_then(|t| t.type_key) {
            Some(key) => Reference::Resolved(key),
            None => ctx.unresolved(&self.spec, "type_key")?,
        };
        if type_ref == Reference::Missing {
            out.skip(
                SkipReason::UnresolvedReference,
                record,
                Some(tconst),
                Some(describe_reference("dim_title_type", None)),
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
                .set("rating_key", Value::Int(resolution.key))
                .set("tconst", Value::text(Some(tconst)))
                .set("title_key", Value::Int(title_key))
                .set("time_key", time_ref.value())
                .set("type_key", type_ref.value())
                .set("average_rating", record.get("averageRating").clone())
                .set("num_votes", record.get("numVotes").clone())
                .finish(),
        );
        Ok(())
    }
}
